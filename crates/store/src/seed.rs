//! Demo dataset: three representative client profiles with accounts,
//! documents, conversation history, knowledge entries, and one scanner
//! alert. A no-op when the store already holds clients.

use chrono::{Duration, Utc};
use uuid::Uuid;

use wealthdesk_core::client::{Account, Alert, ChatMessage, ChatRole, ClientProfile, Document};
use wealthdesk_core::error::StoreError;

use crate::sqlite::SqliteStore;

fn id() -> String {
    Uuid::new_v4().to_string()
}

/// Seed the demo dataset. Returns the number of clients created (0 when the
/// store was already populated).
pub async fn seed(store: &SqliteStore) -> Result<usize, StoreError> {
    if !store.is_empty().await? {
        return Ok(0);
    }

    let now = Utc::now();

    // ── Sarah Chen: first-time home buyer, growth profile ────────────────
    let sarah = ClientProfile {
        id: id(),
        name: "Sarah Chen".into(),
        email: Some("sarah.chen@email.com".into()),
        phone: Some("416-555-0123".into()),
        province: "ON".into(),
        date_of_birth: "1994-06-15".into(),
        risk_profile: "growth".into(),
        goals: vec![
            "Buy a first home in the GTA".into(),
            "Max FHSA before the purchase".into(),
            "Build long-term wealth".into(),
        ],
        marital_status: Some("single".into()),
        dependents: 0,
        employment_income: 145_000.0,
        employer: Some("Shopify".into()),
        advisor_notes:
            "Very engaged client. Asks detailed questions. Prefers email communication. \
             First-time home buyer."
                .into(),
        onboarded_at: now,
    };
    store.upsert_client(&sarah).await?;

    for (kind, label, balance, room) in [
        ("TFSA", "TFSA", 42_000.0, 7_000.0),
        ("FHSA", "FHSA", 16_000.0, 8_000.0),
        ("RRSP", "RRSP", 28_000.0, 18_500.0),
        ("checking", "TD Chequing", 23_500.0, 0.0),
    ] {
        store
            .upsert_account(&Account {
                id: id(),
                client_id: sarah.id.clone(),
                kind: kind.into(),
                label: label.into(),
                balance,
                contribution_room: room,
                last_updated: now,
            })
            .await?;
    }

    store
        .upsert_document(&Document {
            id: id(),
            client_id: sarah.id.clone(),
            kind: "T4".into(),
            content_text: "Employer: Shopify Inc. Employment income: $145,000. \
                           CPP contributions: $3,867. Income tax deducted: $32,450."
                .into(),
            tax_year: Some(2024),
            uploaded_at: now,
        })
        .await?;
    store
        .upsert_document(&Document {
            id: id(),
            client_id: sarah.id.clone(),
            kind: "NOA".into(),
            content_text: "Total income: $145,000. RRSP deduction limit: $18,500. \
                           TFSA room: $7,000."
                .into(),
            tax_year: Some(2024),
            uploaded_at: now,
        })
        .await?;

    let mut msg = ChatMessage::new(
        &sarah.id,
        ChatRole::Client,
        "I've been thinking about buying my first home. Should I keep putting money into \
         my FHSA or start saving in my RRSP? I also have about $23K sitting in chequing.",
    );
    msg.created_at = now - Duration::days(2);
    store.append_chat(&msg).await?;

    let mut msg = ChatMessage::new(
        &sarah.id,
        ChatRole::Advisor,
        "Great question Sarah! Let me look into the numbers on FHSA vs RRSP for your \
         situation. I'll put together an analysis.",
    );
    msg.created_at = now - Duration::days(2) + Duration::hours(1);
    store.append_chat(&msg).await?;

    store
        .add_knowledge(&sarah.id, "Prefers email over phone calls", "advisor")
        .await?;
    store
        .add_knowledge(
            &sarah.id,
            "House hunting in the east end, target budget around $850K",
            "advisor",
        )
        .await?;

    store
        .insert_alert(&Alert {
            id: id(),
            client_id: sarah.id.clone(),
            alert_type: "idle_cash".into(),
            severity: "info".into(),
            title: "Idle cash above threshold".into(),
            body: "Chequing balance of $23,500 exceeds the $10,000 idle-cash threshold \
                   while FHSA room remains."
                .into(),
            drafted_action: serde_json::json!({
                "subject": "Putting your idle cash to work",
                "summary": "Suggest moving $8,000 into the FHSA before year end."
            }),
            status: "pending".into(),
            created_at: now,
        })
        .await?;

    // ── James Park: incorporated dentist, balanced profile ───────────────
    let james = ClientProfile {
        id: id(),
        name: "James Park".into(),
        email: Some("james.park@parkdental.ca".into()),
        phone: Some("604-555-0456".into()),
        province: "BC".into(),
        date_of_birth: "1973-09-22".into(),
        risk_profile: "balanced".into(),
        goals: vec![
            "Retire at 60".into(),
            "Fund daughter's UBC tuition via RESP".into(),
            "Minimize corporate tax".into(),
        ],
        marital_status: Some("married".into()),
        dependents: 1,
        employment_income: 310_000.0,
        employer: Some("Self-employed (Park Dental)".into()),
        advisor_notes:
            "Self-employed dentist, incorporated. Spouse Lisa is a homemaker. Daughter \
             Emily, age 16, starting UBC in 2 years."
                .into(),
        onboarded_at: now,
    };
    store.upsert_client(&james).await?;

    for (kind, label, balance, room) in [
        ("RRSP", "Personal RRSP", 485_000.0, 52_000.0),
        ("TFSA", "TFSA", 88_000.0, 0.0),
        ("RESP", "Emily RESP", 62_000.0, 0.0),
        ("corporate", "Park Dental Corp Investment", 220_000.0, 0.0),
        ("checking", "Business Chequing", 45_000.0, 0.0),
    ] {
        store
            .upsert_account(&Account {
                id: id(),
                client_id: james.id.clone(),
                kind: kind.into(),
                label: label.into(),
                balance,
                contribution_room: room,
                last_updated: now,
            })
            .await?;
    }

    store
        .upsert_document(&Document {
            id: id(),
            client_id: james.id.clone(),
            kind: "T4A".into(),
            content_text: "Self-employment income: $310,000. Professional income from \
                           Park Dental Inc."
                .into(),
            tax_year: Some(2024),
            uploaded_at: now,
        })
        .await?;

    store
        .add_knowledge(
            &james.id,
            "Wants to start winding down clinical hours from 2027",
            "advisor",
        )
        .await?;

    // ── Eleanor Whitfield: retiree drawing a RRIF, conservative ──────────
    let eleanor = ClientProfile {
        id: id(),
        name: "Eleanor Whitfield".into(),
        email: Some("e.whitfield@email.com".into()),
        phone: None,
        province: "QC".into(),
        date_of_birth: "1952-03-04".into(),
        risk_profile: "conservative".into(),
        goals: vec![
            "Preserve capital".into(),
            "Keep OAS clawback to a minimum".into(),
        ],
        marital_status: Some("widowed".into()),
        dependents: 0,
        employment_income: 48_000.0,
        employer: None,
        advisor_notes: "Retired teacher. Pension income plus RRIF withdrawals. Calls \
                        quarterly, likes printed statements."
            .into(),
        onboarded_at: now,
    };
    store.upsert_client(&eleanor).await?;

    for (kind, label, balance, room) in [
        ("RRIF", "RRIF".to_string(), 390_000.0, 0.0),
        ("TFSA", "TFSA".to_string(), 95_000.0, 7_000.0),
        ("savings", "High-interest savings".to_string(), 31_000.0, 0.0),
    ] {
        store
            .upsert_account(&Account {
                id: id(),
                client_id: eleanor.id.clone(),
                kind: kind.into(),
                label,
                balance,
                contribution_room: room,
                last_updated: now,
            })
            .await?;
    }

    store
        .add_knowledge(&eleanor.id, "Granddaughter starting CEGEP next fall", "advisor")
        .await?;

    Ok(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_populates_once() {
        let store = SqliteStore::new("sqlite::memory:").await.unwrap();
        assert_eq!(seed(&store).await.unwrap(), 3);
        // Second run is a no-op
        assert_eq!(seed(&store).await.unwrap(), 0);

        let clients = store.list_clients().await.unwrap();
        assert_eq!(clients.len(), 3);

        let sarah = clients.iter().find(|c| c.name == "Sarah Chen").unwrap();
        assert_eq!(store.accounts_for(&sarah.id).await.unwrap().len(), 4);
        assert_eq!(store.knowledge_for(&sarah.id).await.unwrap().len(), 2);
        assert_eq!(store.pending_alert_count(&sarah.id).await.unwrap(), 1);
    }
}
