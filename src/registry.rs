//! Domain registry, execution planning, and the inspector that runs a plan.
//!
//! Planning is deterministic: `system-info` first, then lexicographic by domain id, with any
//! dependency inserted ahead of its dependent and marked as not surfaced unless it was
//! requested too. Raw retrieval may run in parallel; decode and classify always run in plan
//! order so a dependency's record exists before its dependent is classified.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::cpu::CpuContext;
use crate::domains::{Domain, DomainId, RawData};
use crate::error::DomainError;
use crate::transport::Transports;
use crate::types::{DomainReport, FailedDomain, FeatureRecord, InspectionReport};

/// Ordered catalog of known domains
pub struct DomainRegistry {
    domains: &'static [&'static Domain],
}

/// One domain scheduled by a plan
#[derive(Debug, Clone, Copy)]
pub struct PlannedDomain {
    pub domain: &'static Domain,
    /// False for dependencies pulled in only to feed another domain's classifier
    pub surfaced: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    steps: Vec<PlannedDomain>,
}

impl ExecutionPlan {
    pub fn steps(&self) -> &[PlannedDomain] {
        &self.steps
    }

    pub fn ids(&self) -> impl Iterator<Item = DomainId> + '_ {
        self.steps.iter().map(|s| s.domain.id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_surfaced(&self, id: DomainId) -> bool {
        self.steps.iter().any(|s| s.domain.id == id && s.surfaced)
    }

    /// True if a later step needs this domain's record
    fn feeds_dependent(&self, id: DomainId) -> bool {
        self.steps.iter().any(|s| s.domain.depends_on == Some(id))
    }

    fn position(&self, id: DomainId) -> Option<usize> {
        self.steps.iter().position(|s| s.domain.id == id)
    }
}

impl DomainRegistry {
    pub const fn new(domains: &'static [&'static Domain]) -> Self {
        Self { domains }
    }

    pub fn get(&self, id: DomainId) -> Option<&'static Domain> {
        self.domains.iter().copied().find(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Domain> + '_ {
        self.domains.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Domains in output order: `system-info` first, the rest by id
    pub fn ordered(&self) -> Vec<&'static Domain> {
        let mut ordered: Vec<_> = self.iter().collect();
        ordered.sort_by_key(|d| (d.id != DomainId::SystemInfo, d.id.as_str()));
        ordered
    }

    /// Resolve a selection into an execution plan. An empty selection means every domain.
    pub fn plan(&self, selection: &[DomainId]) -> ExecutionPlan {
        let mut plan = ExecutionPlan::default();
        for domain in self.ordered() {
            if selection.is_empty() || selection.contains(&domain.id) {
                self.schedule(&mut plan, domain, true, 0);
            }
        }
        debug!("Planned {} domains: {:?}", plan.len(), plan.ids().map(DomainId::as_str).collect::<Vec<_>>());
        plan
    }

    fn schedule(&self, plan: &mut ExecutionPlan, domain: &'static Domain, surfaced: bool, depth: usize) {
        if let Some(pos) = plan.position(domain.id) {
            plan.steps[pos].surfaced |= surfaced;
            return;
        }
        if depth > self.domains.len() {
            warn!("Dependency chain through {} is cyclic, ignoring", domain.id);
            return;
        }
        if let Some(dependency) = domain.depends_on.and_then(|id| self.get(id)) {
            self.schedule(plan, dependency, false, depth + 1);
        }
        plan.steps.push(PlannedDomain { domain, surfaced });
    }
}

/// Runs execution plans against one set of transports
pub struct Inspector<'a> {
    transports: Transports<'a>,
    cpu: OnceLock<CpuContext>,
    parallel: bool,
}

impl<'a> Inspector<'a> {
    pub fn new(transports: Transports<'a>) -> Self {
        Self { transports, cpu: OnceLock::new(), parallel: true }
    }

    /// Use a known CPU context instead of querying `Win32_Processor`
    pub fn with_cpu(transports: Transports<'a>, cpu: CpuContext) -> Self {
        let inspector = Self::new(transports);
        let _ = inspector.cpu.set(cpu);
        inspector
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The CPU context, resolved on first use
    pub fn cpu(&self) -> CpuContext {
        *self.cpu.get_or_init(|| CpuContext::resolve(self.transports.properties))
    }

    fn fetch_all(&self, plan: &ExecutionPlan) -> Vec<Result<RawData, DomainError>> {
        if self.parallel {
            plan.steps().par_iter().map(|step| step.domain.fetch(&self.transports)).collect()
        } else {
            plan.steps().iter().map(|step| step.domain.fetch(&self.transports)).collect()
        }
    }

    /// Fetch, decode, and classify every planned domain. A failing domain never stops the
    /// others. Domains this OS build does not expose are dropped silently; other failures of
    /// surfaced domains are listed in [`InspectionReport::failed`].
    pub fn run(&self, plan: &ExecutionPlan) -> InspectionReport {
        let cpu = self.cpu();
        let mut report = InspectionReport::new(cpu);
        let mut records: FxHashMap<DomainId, FeatureRecord> = FxHashMap::default();

        let fetched = self.fetch_all(plan);
        for (step, raw) in plan.steps().iter().zip(fetched) {
            let domain = step.domain;
            match raw.and_then(|raw| domain.decode(&raw)) {
                Ok(mut record) => {
                    let dependency = domain.depends_on.and_then(|id| records.get(&id));
                    if domain.depends_on.is_some() && dependency.is_none() {
                        debug!("{}: dependency unavailable, using fallback rules", domain.id);
                    }
                    let classification = (domain.classify)(&record, &cpu, dependency);
                    classification.apply_to(&mut record);
                    debug!(
                        "{}: {} fields, {} present, {} synthesized",
                        domain.id,
                        record.len(),
                        record.present_count(),
                        classification.synthesized.len()
                    );

                    if plan.feeds_dependent(domain.id) {
                        records.insert(domain.id, record.clone());
                    }
                    if step.surfaced {
                        report.domains.push(DomainReport::new(
                            domain.id,
                            domain.title,
                            record,
                            classification.annotations,
                        ));
                    }
                }
                Err(e) if e.is_expected() => {
                    debug!("{}: {}, omitted", domain.id, e);
                }
                Err(e) => {
                    warn!("Domain {} failed: {}", domain.id, e);
                    if step.surfaced {
                        report.failed.push(FailedDomain { id: domain.id, reason: e.to_string() });
                    }
                }
            }
        }

        info!(
            "Inspected {} domains ({} failed), {} insecure fields",
            report.domains.len(),
            report.failed.len(),
            report.insecure_count()
        );
        report
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
