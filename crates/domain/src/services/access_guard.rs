//! Tenant isolation checks for report jobs.

use crate::errors::ReportError;
use crate::models::{Principal, ReportJob, Role};

/// Decides whether a principal may see or download a job.
///
/// Pure: no store access, no side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    /// Owner, any ADMIN, or a DISTRICT_ADMIN of the job's district.
    ///
    /// A missing principal is always denied.
    pub fn can_view(principal: Option<&Principal>, job: &ReportJob) -> bool {
        let Some(principal) = principal else {
            return false;
        };

        principal.user_id == job.user_id
            || principal.is_admin()
            || (principal.has_role(Role::DistrictAdmin)
                && principal.district_id == Some(job.district_id))
    }

    pub fn ensure_can_view(
        principal: Option<&Principal>,
        job: &ReportJob,
    ) -> Result<(), ReportError> {
        if Self::can_view(principal, job) {
            Ok(())
        } else {
            Err(ReportError::Forbidden {
                report_id: job.report_id,
            })
        }
    }

    /// Gate for district-wide listings: ADMIN, or DISTRICT_ADMIN of that district.
    pub fn can_view_district(principal: Option<&Principal>, district_id: i64) -> bool {
        match principal {
            Some(p) => {
                p.is_admin()
                    || (p.has_role(Role::DistrictAdmin) && p.district_id == Some(district_id))
            }
            None => false,
        }
    }
}
