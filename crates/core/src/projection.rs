//! Read-only dashboard counts derived from stored requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::request::{Request, RequestStatus};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub open: usize,
    pub by_status: BTreeMap<RequestStatus, usize>,
    pub by_type: BTreeMap<String, TypeSummary>,
    /// Open requests keyed by the role they are waiting on.
    pub pending_by_role: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub total: usize,
    pub open: usize,
    pub rejected: usize,
    pub completed: usize,
}

impl DashboardSummary {
    pub fn from_requests(requests: &[Request]) -> Self {
        let mut summary = Self { total: requests.len(), ..Self::default() };

        for request in requests {
            *summary.by_status.entry(request.status).or_default() += 1;

            let by_type = summary.by_type.entry(request.request_type.clone()).or_default();
            by_type.total += 1;

            match request.status {
                RequestStatus::Pending | RequestStatus::Forwarded => {
                    summary.open += 1;
                    by_type.open += 1;
                    if let Some(role) = &request.current_approver_role {
                        *summary.pending_by_role.entry(role.clone()).or_default() += 1;
                    }
                }
                RequestStatus::Rejected => by_type.rejected += 1,
                RequestStatus::Approved
                | RequestStatus::Ordered
                | RequestStatus::Received
                | RequestStatus::Closed => by_type.completed += 1,
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::DashboardSummary;
    use crate::domain::request::{Payload, Request, RequestId, RequestStatus};

    fn request(id: &str, kind: &str, status: RequestStatus, role: Option<&str>) -> Request {
        let now = Utc::now();
        Request {
            id: RequestId(id.to_string()),
            request_type: kind.to_string(),
            payload: Payload::new(),
            status,
            current_approver_role: role.map(str::to_string),
            approval_flow: Vec::new(),
            created_by: "u-1".to_string(),
            created_by_name: "Clerk".to_string(),
            created_at: now,
            updated_at: now,
            history: Vec::new(),
            version: 1,
        }
    }

    #[test]
    fn counts_by_type_status_and_waiting_role() {
        let summary = DashboardSummary::from_requests(&[
            request("R1", "book_order", RequestStatus::Pending, Some("asst_store")),
            request("R2", "book_order", RequestStatus::Approved, None),
            request("R3", "facility_request", RequestStatus::Forwarded, Some("registrar")),
            request("R4", "facility_request", RequestStatus::Rejected, None),
            request("R5", "stock_request", RequestStatus::Pending, Some("registrar")),
        ]);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.open, 3);
        assert_eq!(summary.by_status.get(&RequestStatus::Pending), Some(&2));
        assert_eq!(summary.pending_by_role.get("registrar"), Some(&2));
        assert_eq!(summary.pending_by_role.get("asst_store"), Some(&1));

        let facility = &summary.by_type["facility_request"];
        assert_eq!((facility.total, facility.open, facility.rejected, facility.completed), (2, 1, 1, 0));
        assert_eq!(summary.by_type["book_order"].completed, 1);
    }

    #[test]
    fn empty_input_yields_zeroed_summary() {
        assert_eq!(DashboardSummary::from_requests(&[]), DashboardSummary::default());
    }
}
