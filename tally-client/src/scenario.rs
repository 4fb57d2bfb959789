//! The reference run against a live ledger, as a pure orchestration function:
//! it drives the contract through every call mode and returns one report per
//! step, or fails fast on the first unexpected outcome.

use crate::gateway::{CallError, Gateway};

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use serde_json::Value;

pub struct StepReport {
    pub label: &'static str,
    pub detail: String,
}

fn step(label: &'static str, detail: String) -> StepReport {
    StepReport { label, detail }
}

pub async fn run_scenario(gateway: &Gateway, run_id: &str) -> Result<Vec<StepReport>> {
    let payment_id = format!("payment{run_id}");
    let mut reports = Vec::new();

    gateway.submit("InitLedger", &[]).await?;
    reports.push(step("InitLedger", "sample payments seeded".to_string()));

    for (n, (username, tax_payer_id)) in [("Aldo", "A1"), ("Giovanni", "G1"), ("Giacomo", "G2")]
        .into_iter()
        .enumerate()
    {
        let user_id = format!("subject{run_id}-{n}");
        gateway
            .submit("CreateSubject", &[&user_id, username, tax_payer_id])
            .await?;
        reports.push(step("CreateSubject", format!("created user {username}")));
    }

    let date = Utc
        .with_ymd_and_hms(2023, 6, 2, 0, 0, 0)
        .single()
        .context("invalid sample date")?
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string();
    gateway
        .submit(
            "CreatePayment",
            &[
                &payment_id,
                "ordine15",
                "contanti",
                &date,
                "Tomoko.com",
                "Tomoko",
                "3000",
            ],
        )
        .await?;
    reports.push(step("CreatePayment", format!("created {payment_id}")));

    let listing = gateway.evaluate("GetAllAssets", &[]).await?;
    let listing: Vec<Value> = serde_json::from_slice(&listing)?;
    reports.push(step(
        "GetAllAssets",
        format!("{} records on the ledger", listing.len()),
    ));

    let subjects = gateway.evaluate("GetAllAssets", &["subject"]).await?;
    let subjects: Vec<Value> = serde_json::from_slice(&subjects)?;
    reports.push(step(
        "GetAllAssets",
        format!("{} of them are subjects", subjects.len()),
    ));

    let submitted = gateway
        .submit_async("TransferPayment", &[&payment_id, "Saptha"])
        .await?;
    let previous_owner = String::from_utf8_lossy(submitted.result()).into_owned();
    let status = submitted.status().await?;
    reports.push(step(
        "TransferPayment",
        format!(
            "owner {previous_owner:?} -> \"Saptha\", transaction {} committed",
            status.transaction_id
        ),
    ));

    let payment = gateway.evaluate("ReadPayment", &[&payment_id]).await?;
    let payment: Value = serde_json::from_slice(&payment)?;
    let total = payment
        .get("paymentTotal")
        .and_then(Value::as_f64)
        .context("payment has no paymentTotal")?;
    reports.push(step("ReadPayment", format!("paymentTotal is {total}")));

    // This one must fail inside the contract; the original failure text has
    // to reach us unmodified.
    match gateway
        .submit(
            "UpdatePayment",
            &[
                "payment70",
                "ordine1",
                "POS",
                &date,
                "Tomoko.com",
                "Tomoko",
                "300",
            ],
        )
        .await
    {
        Err(CallError::Contract(message)) => {
            reports.push(step(
                "UpdatePayment",
                format!("caught expected failure: {message}"),
            ));
        }
        Err(other) => return Err(other.into()),
        Ok(_) => bail!("update of a nonexistent payment unexpectedly succeeded"),
    }

    Ok(reports)
}
