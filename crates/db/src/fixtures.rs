//! Demo dataset for local walkthroughs.
//!
//! Every seeded request is driven through the real lifecycle engine, so the
//! resulting records, history and notifications are exactly what live traffic
//! would produce.

use serde_json::{json, Value};

use campusdesk_core::domain::request::{Actor, Payload, RequestId, RequestStatus, Submitter};
use campusdesk_core::errors::LifecycleError;
use campusdesk_core::lifecycle::{LifecycleEngine, TransitionKind};
use campusdesk_core::store::RequestStore;

#[derive(Debug, Clone, Copy)]
struct SeedStep {
    kind: TransitionKind,
    user_id: &'static str,
    name: &'static str,
    role: &'static str,
    comment: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
struct SeedRequestContract {
    label: &'static str,
    request_type: &'static str,
    submitter_id: &'static str,
    submitter_name: &'static str,
    steps: &'static [SeedStep],
    expected_status: RequestStatus,
    expected_role: Option<&'static str>,
    description: &'static str,
}

const fn step(
    kind: TransitionKind,
    user_id: &'static str,
    name: &'static str,
    role: &'static str,
    comment: Option<&'static str>,
) -> SeedStep {
    SeedStep { kind, user_id, name, role, comment }
}

const SEED_REQUESTS: &[SeedRequestContract] = &[
    SeedRequestContract {
        label: "book-order-pending",
        request_type: "book_order",
        submitter_id: "u-lib-7",
        submitter_name: "Meera Iyer",
        steps: &[],
        expected_status: RequestStatus::Pending,
        expected_role: Some("asst_store"),
        description: "Fresh book order waiting on the store",
    },
    SeedRequestContract {
        label: "library-purchase-ordered",
        request_type: "library_purchase",
        submitter_id: "u-lib-7",
        submitter_name: "Meera Iyer",
        steps: &[
            step(TransitionKind::Approve, "u-alib-1", "Kiran Das", "asst_librarian", None),
            step(TransitionKind::Approve, "u-reg-1", "Dr. S. Menon", "registrar", Some("within budget")),
            step(TransitionKind::Approve, "u-prin-1", "Dr. A. Rao", "principal", None),
        ],
        expected_status: RequestStatus::Ordered,
        expected_role: None,
        description: "Journal subscription approved by every role",
    },
    SeedRequestContract {
        label: "timing-request-rejected",
        request_type: "timing_request",
        submitter_id: "u-lib-2",
        submitter_name: "Anil Rao",
        steps: &[step(
            TransitionKind::Reject,
            "u-reg-1",
            "Dr. S. Menon",
            "registrar",
            Some("exam week, revisit next month"),
        )],
        expected_status: RequestStatus::Rejected,
        expected_role: None,
        description: "Extended hours turned down by the registrar",
    },
    SeedRequestContract {
        label: "teacher-application-forwarded",
        request_type: "teacher_application",
        submitter_id: "u-staff-4",
        submitter_name: "Office Desk",
        steps: &[step(
            TransitionKind::Forward,
            "u-hod-cs",
            "Prof. N. Shah",
            "hod",
            Some("strong candidate"),
        )],
        expected_status: RequestStatus::Forwarded,
        expected_role: Some("registrar"),
        description: "Application forwarded from HOD to registrar",
    },
    SeedRequestContract {
        label: "equipment-request-mid-chain",
        request_type: "equipment_request",
        submitter_id: "u-lab-3",
        submitter_name: "Ravi Kumar",
        steps: &[step(TransitionKind::Approve, "u-lab-1", "Lab Office", "lab_assistant", None)],
        expected_status: RequestStatus::Pending,
        expected_role: Some("hod"),
        description: "Oscilloscopes approved by the lab, waiting on HOD",
    },
    SeedRequestContract {
        label: "stock-request-received",
        request_type: "stock_request",
        submitter_id: "u-ws-2",
        submitter_name: "Sunita Pillai",
        steps: &[
            step(TransitionKind::Approve, "u-ws-1", "Workshop Lead", "workshop_instructor", None),
            step(TransitionKind::Approve, "u-reg-1", "Dr. S. Menon", "registrar", None),
        ],
        expected_status: RequestStatus::Received,
        expected_role: None,
        description: "Workshop consumables fully approved",
    },
    SeedRequestContract {
        label: "facility-request-advanced",
        request_type: "facility_request",
        submitter_id: "u-hod-me",
        submitter_name: "Prof. L. George",
        steps: &[step(TransitionKind::Approve, "u-hod-me", "Prof. L. George", "hod", None)],
        expected_status: RequestStatus::Forwarded,
        expected_role: Some("registrar"),
        description: "Seminar hall repair moved on to the registrar",
    },
];

fn seed_payload(label: &str) -> Payload {
    let value = match label {
        "book-order-pending" => json!({
            "title": "Introduction to Algorithms, 4th ed.",
            "quantity": 6,
            "estimated_cost": "7440.00"
        }),
        "library-purchase-ordered" => json!({
            "title": "IEEE Xplore annual subscription",
            "quantity": 1,
            "estimated_cost": "185000.00"
        }),
        "timing-request-rejected" => json!({
            "title": "Library open till 22:00",
            "requested_timing": "08:00-22:00",
            "effective_from": "2026-11-16"
        }),
        "teacher-application-forwarded" => json!({
            "applicant_name": "Dr. P. Varghese",
            "department": "Computer Science",
            "position": "Assistant Professor"
        }),
        "equipment-request-mid-chain" => json!({
            "item_name": "Digital storage oscilloscope",
            "quantity": 4,
            "estimated_cost": 96000
        }),
        "stock-request-received" => json!({
            "item_name": "Mild steel rods 12mm",
            "quantity": 150
        }),
        _ => json!({
            "title": "Seminar hall projector repair",
            "location": "Block C, Seminar Hall 2",
            "estimated_cost": "18500"
        }),
    };
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// Submits every demo request and replays its transitions.
    pub async fn load<S>(engine: &LifecycleEngine<S>) -> Result<SeedResult, LifecycleError>
    where
        S: RequestStore + ?Sized,
    {
        let mut requests_seeded = Vec::with_capacity(SEED_REQUESTS.len());

        for contract in SEED_REQUESTS {
            let submitter = Submitter::new(contract.submitter_id, contract.submitter_name);
            let request = engine
                .create(contract.request_type, seed_payload(contract.label), &submitter)
                .await?;

            for step in contract.steps {
                let actor = Actor::new(step.user_id, step.name, step.role);
                match step.kind {
                    TransitionKind::Approve => engine.approve(&request.id, &actor, step.comment).await?,
                    TransitionKind::Reject => engine.reject(&request.id, &actor, step.comment).await?,
                    TransitionKind::Forward => engine.forward(&request.id, &actor, step.comment).await?,
                };
            }

            requests_seeded.push(RequestSeedInfo {
                label: contract.label,
                request_id: request.id,
                request_type: contract.request_type,
                description: contract.description,
            });
        }

        Ok(SeedResult { requests_seeded })
    }

    /// Checks that each seeded request reached its expected state.
    pub async fn verify<S>(
        engine: &LifecycleEngine<S>,
        seeded: &SeedResult,
    ) -> Result<VerificationResult, LifecycleError>
    where
        S: RequestStore + ?Sized,
    {
        let mut checks = Vec::with_capacity(seeded.requests_seeded.len());

        for info in &seeded.requests_seeded {
            let Some(contract) = SEED_REQUESTS.iter().find(|c| c.label == info.label) else {
                checks.push((info.label, false));
                continue;
            };
            let stored = engine.get(&info.request_id).await?;
            let matches = stored.status == contract.expected_status
                && stored.current_approver_role.as_deref() == contract.expected_role
                && stored.history.len() == contract.steps.len() + 1;
            checks.push((info.label, matches));
        }

        let all_present = checks.len() == SEED_REQUESTS.len() && checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub requests_seeded: Vec<RequestSeedInfo>,
}

#[derive(Debug)]
pub struct RequestSeedInfo {
    pub label: &'static str,
    pub request_id: RequestId,
    pub request_type: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
