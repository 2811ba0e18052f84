//! TPM 2.0 permanent and startup-clear attributes.
//!
//! The status is read with a `TPM2_GetCapability(TPM_CAP_TPM_PROPERTIES)` exchange. The two
//! attribute words are packed into an 8-byte blob (`TPM_PT_PERMANENT` low, `TPM_PT_STARTUP_CLEAR`
//! high) and decoded like any other bit layout.

use super::{Domain, DomainId, FieldNote, Layout, RawSource};
use crate::bitfield::{BitFieldSpec, FieldSpec};
use crate::classifier::{Annotator, Classification};
use crate::cpu::CpuContext;
use crate::error::{DecodeError, DomainError};
use crate::types::{FeatureRecord, Secure};

pub const TPM_ST_NO_SESSIONS: u16 = 0x8001;
pub const TPM_CC_GET_CAPABILITY: u32 = 0x0000_017A;
pub const TPM_CAP_TPM_PROPERTIES: u32 = 6;
pub const TPM_PT_PERMANENT: u32 = 0x200;
pub const TPM_PT_STARTUP_CLEAR: u32 = 0x201;

const HEADER_LEN: usize = 10;

static FIELDS: [FieldSpec; 14] = [
    FieldSpec::flag("OwnerAuthSet", 0),
    FieldSpec::flag("EndorsementAuthSet", 1),
    FieldSpec::flag("LockoutAuthSet", 2),
    FieldSpec::reserved(3, 5),
    FieldSpec::flag("DisableClear", 8),
    FieldSpec::flag("InLockout", 9),
    FieldSpec::flag("TpmGeneratedEps", 10),
    FieldSpec::reserved(11, 21),
    FieldSpec::flag("PhEnable", 32),
    FieldSpec::flag("ShEnable", 33),
    FieldSpec::flag("EhEnable", 34),
    FieldSpec::flag("PhEnableNv", 35),
    FieldSpec::reserved(36, 27),
    FieldSpec::flag("Orderly", 63),
];

pub static LAYOUT: BitFieldSpec = BitFieldSpec { name: "tpm", min_len: 4, max_len: 8, fields: &FIELDS };

static NOTES: [FieldNote; 3] = [
    FieldNote { name: "InLockout", description: "Dictionary-attack lockout is active" },
    FieldNote { name: "DisableClear", description: "TPM2_Clear is disabled" },
    FieldNote { name: "Orderly", description: "The last shutdown was orderly" },
];

pub static DOMAIN: Domain = Domain {
    id: DomainId::Tpm,
    title: "TPM",
    source: RawSource::TpmCapability {
        capability: TPM_CAP_TPM_PROPERTIES,
        property: TPM_PT_PERMANENT,
        count: 2,
    },
    layout: Layout::Bits(&LAYOUT),
    classify,
    depends_on: None,
    notes: &NOTES,
};

/// Build a `TPM2_GetCapability` command with no sessions
pub fn get_capability_command(capability: u32, property: u32, count: u32) -> Vec<u8> {
    let mut command = Vec::with_capacity(22);
    command.extend_from_slice(&TPM_ST_NO_SESSIONS.to_be_bytes());
    command.extend_from_slice(&22u32.to_be_bytes());
    command.extend_from_slice(&TPM_CC_GET_CAPABILITY.to_be_bytes());
    command.extend_from_slice(&capability.to_be_bytes());
    command.extend_from_slice(&property.to_be_bytes());
    command.extend_from_slice(&count.to_be_bytes());
    command
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take<const N: usize>(&mut self, what: &str) -> Result<[u8; N], DecodeError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + N)
            .ok_or_else(|| DecodeError::malformed(format!("tpm response truncated at {}", what)))?;
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8, DecodeError> {
        Ok(self.take::<1>(what)?[0])
    }

    fn u32(&mut self, what: &str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.take::<4>(what)?))
    }
}

/// Parse a `TPM2_GetCapability` response into the attribute blob.
///
/// A non-zero response code fails the query; a missing `TPM_PT_PERMANENT` property or a short
/// buffer is a malformed response.
pub fn parse_capability_response(response: &[u8]) -> Result<Vec<u8>, DomainError> {
    let mut reader = Reader { data: response, pos: 0 };
    let _tag = reader.take::<2>("tag")?;
    let size = reader.u32("size")? as usize;
    let code = reader.u32("response code")?;
    if code != 0 {
        return Err(DomainError::QueryFailed { code: format!("TPM_RC 0x{:08X}", code) });
    }
    if size < HEADER_LEN || size > response.len() {
        let message = format!("tpm response size {} does not match {} bytes", size, response.len());
        return Err(DecodeError::malformed(message).into());
    }
    reader.data = &response[..size];

    let _more_data = reader.u8("moreData")?;
    let capability = reader.u32("capability")?;
    if capability != TPM_CAP_TPM_PROPERTIES {
        return Err(DecodeError::malformed(format!("unexpected capability {}", capability)).into());
    }

    let count = reader.u32("count")?;
    let mut permanent = None;
    let mut startup_clear = None;
    for _ in 0..count {
        let property = reader.u32("property")?;
        let value = reader.u32("value")?;
        match property {
            TPM_PT_PERMANENT => permanent = Some(value),
            TPM_PT_STARTUP_CLEAR => startup_clear = Some(value),
            _ => {}
        }
    }

    let permanent = permanent.ok_or_else(|| DecodeError::malformed("TPM_PT_PERMANENT missing from response"))?;
    let mut blob = permanent.to_le_bytes().to_vec();
    if let Some(startup_clear) = startup_clear {
        blob.extend_from_slice(&startup_clear.to_le_bytes());
    }
    Ok(blob)
}

pub fn classify(record: &FeatureRecord, _cpu: &CpuContext, _dependency: Option<&FeatureRecord>) -> Classification {
    let mut a = Annotator::new(record);
    a.set("InLockout", Secure::from_option(record.flag("InLockout").map(|locked| !locked)));
    a.finish()
}

/// Build a well-formed response carrying the given properties
#[cfg(test)]
pub(crate) fn capability_response(properties: &[(u32, u32)]) -> Vec<u8> {
    let size = HEADER_LEN + 1 + 4 + 4 + properties.len() * 8;
    let mut response = Vec::with_capacity(size);
    response.extend_from_slice(&TPM_ST_NO_SESSIONS.to_be_bytes());
    response.extend_from_slice(&(size as u32).to_be_bytes());
    response.extend_from_slice(&0u32.to_be_bytes());
    response.push(0);
    response.extend_from_slice(&TPM_CAP_TPM_PROPERTIES.to_be_bytes());
    response.extend_from_slice(&(properties.len() as u32).to_be_bytes());
    for (property, value) in properties {
        response.extend_from_slice(&property.to_be_bytes());
        response.extend_from_slice(&value.to_be_bytes());
    }
    response
}
