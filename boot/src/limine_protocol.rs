//! Limine boot protocol glue.
//!
//! Only the pieces the interrupt core's collaborators need: the base
//! revision handshake and the HHDM offset that backs MMIO mapping.

use limine::BaseRevision;
use limine::request::{HhdmRequest, RequestsEndMarker, RequestsStartMarker};

#[used]
#[unsafe(link_section = ".requests")]
static BASE_REVISION: BaseRevision = BaseRevision::new();

#[used]
#[unsafe(link_section = ".requests")]
static HHDM_REQUEST: HhdmRequest = HhdmRequest::new();

#[used]
#[unsafe(link_section = ".requests_start_marker")]
static _START_MARKER: RequestsStartMarker = RequestsStartMarker::new();

#[used]
#[unsafe(link_section = ".requests_end_marker")]
static _END_MARKER: RequestsEndMarker = RequestsEndMarker::new();

/// True when the bootloader understands the requested protocol revision.
pub fn base_revision_supported() -> bool {
    BASE_REVISION.is_supported()
}

/// Virtual offset of the higher-half direct map, if the bootloader provided one.
pub fn hhdm_offset() -> Option<u64> {
    HHDM_REQUEST.get_response().map(|response| response.offset())
}
