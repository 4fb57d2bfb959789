//! The ledger contract: named transactions over the world state.
//!
//! Transactions are wired into an explicit registry rather than discovered by
//! reflection, and every mutating path goes through the same existence
//! predicate before touching the store.

use crate::store::StateStore;
use tally_common::canonical::to_canonical_bytes;
use tally_common::message::TransactionCall;
use tally_common::record::{Payment, Record, Subject};
use tally_common::ContractError;

use std::collections::HashMap;

use serde_json::Value;

type Handler = fn(&mut dyn StateStore, &[String]) -> Result<Vec<u8>, ContractError>;

pub struct LedgerContract {
    registry: HashMap<&'static str, Handler>,
}

impl Default for LedgerContract {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerContract {
    pub fn new() -> Self {
        let mut registry: HashMap<&'static str, Handler> = HashMap::new();
        registry.insert("InitLedger", init_ledger);
        registry.insert("CreatePayment", create_payment);
        registry.insert("CreateSubject", create_subject);
        registry.insert("ReadPayment", read_payment);
        registry.insert("UpdatePayment", update_payment);
        registry.insert("DeletePayment", delete_payment);
        registry.insert("TransferPayment", transfer_payment);
        registry.insert("PaymentExists", payment_exists);
        registry.insert("GetAllAssets", get_all_assets);
        // Historical alias kept for callers of the payment-only name.
        registry.insert("GetAllPayments", get_all_assets);
        Self { registry }
    }

    pub fn invoke(
        &self,
        store: &mut dyn StateStore,
        call: &TransactionCall,
    ) -> Result<Vec<u8>, ContractError> {
        let handler = self
            .registry
            .get(call.name.as_str())
            .ok_or_else(|| ContractError::UnknownTransaction(call.name.clone()))?;
        handler(store, &call.args)
    }
}

/// True iff the key holds a non-empty value. Every create/update/delete/
/// transfer checks through here before mutating.
fn record_exists(store: &dyn StateStore, key: &str) -> bool {
    store
        .get(key.as_bytes())
        .map_or(false, |value| !value.is_empty())
}

fn expect_args(transaction: &str, args: &[String], expected: usize) -> Result<(), ContractError> {
    if args.len() != expected {
        return Err(ContractError::ArgumentCount {
            transaction: transaction.to_string(),
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

fn put_record(store: &mut dyn StateStore, record: &Record) -> Result<Vec<u8>, ContractError> {
    let bytes = to_canonical_bytes(record)?;
    store.put(record.key().as_bytes(), &bytes);
    Ok(bytes)
}

/// Fixed sample payments seeded by InitLedger. Dates are pre-rendered ISO
/// strings so every replica stores identical bytes.
fn sample_payments() -> Vec<Payment> {
    let sample = |id: &str, order: &str, kind: &str, date: &str, total: f64| Payment {
        payment_id: id.into(),
        order_id: order.into(),
        payment_type: kind.into(),
        payment_date_time: date.into(),
        payment_receipt_uri: "Tomoko.com".into(),
        payment_receipt_hash: "Tomoko".into(),
        payment_total: total,
        owner: None,
    };
    vec![
        sample("payment1", "ord1", "contanti", "2000-02-01T03:03:03.000Z", 300.0),
        sample("payment2", "ord2", "POS", "2020-02-01T03:03:03.000Z", 30.0),
        sample("payment3", "ord3", "rate", "2023-02-01T03:03:03.000Z", 300.0),
        sample("payment5", "ord5", "contanti", "2000-02-01T03:03:03.000Z", 300.0),
        sample("payment6", "ord6", "POS", "2020-02-01T03:03:03.000Z", 30.0),
        sample("payment4", "ord4", "rate", "2023-02-01T03:03:03.000Z", 300.0),
    ]
}

fn init_ledger(store: &mut dyn StateStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
    expect_args("InitLedger", args, 0)?;
    for payment in sample_payments() {
        put_record(store, &Record::Payment(payment))?;
    }
    Ok(Vec::new())
}

fn create_payment(store: &mut dyn StateStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
    expect_args("CreatePayment", args, 7)?;
    let payment_id = &args[0];
    if record_exists(&*store, payment_id) {
        return Err(ContractError::AlreadyExists(payment_id.clone()));
    }
    let payment = payment_from_args(args)?;
    put_record(store, &Record::Payment(payment))
}

fn create_subject(store: &mut dyn StateStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
    expect_args("CreateSubject", args, 3)?;
    let user_id = &args[0];
    if record_exists(&*store, user_id) {
        return Err(ContractError::AlreadyExists(user_id.clone()));
    }
    let subject = Subject {
        user_id: user_id.clone(),
        username: args[1].clone(),
        tax_payer_id: args[2].clone(),
    };
    put_record(store, &Record::Subject(subject))
}

fn read_payment(store: &mut dyn StateStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
    expect_args("ReadPayment", args, 1)?;
    let id = &args[0];
    match store.get(id.as_bytes()) {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(ContractError::NotFound(id.clone())),
    }
}

fn update_payment(store: &mut dyn StateStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
    expect_args("UpdatePayment", args, 7)?;
    let payment_id = &args[0];
    if !record_exists(&*store, payment_id) {
        return Err(ContractError::NotFound(payment_id.clone()));
    }
    // Full replace, not a merge: a previously transferred owner is dropped.
    let payment = payment_from_args(args)?;
    put_record(store, &Record::Payment(payment))
}

fn delete_payment(store: &mut dyn StateStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
    expect_args("DeletePayment", args, 1)?;
    let id = &args[0];
    if !record_exists(&*store, id) {
        return Err(ContractError::NotFound(id.clone()));
    }
    store.delete(id.as_bytes());
    Ok(Vec::new())
}

/// Reassigns the payment's owner and returns the previous owner, which is
/// empty before the first transfer.
fn transfer_payment(store: &mut dyn StateStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
    expect_args("TransferPayment", args, 2)?;
    let id = &args[0];
    let new_owner = &args[1];
    let bytes = match store.get(id.as_bytes()) {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(ContractError::NotFound(id.clone())),
    };
    let record: Record =
        serde_json::from_slice(&bytes).map_err(|_| ContractError::Malformed(id.clone()))?;
    match record {
        Record::Payment(mut payment) => {
            let previous = payment.owner.replace(new_owner.clone()).unwrap_or_default();
            put_record(store, &Record::Payment(payment))?;
            Ok(previous.into_bytes())
        }
        Record::Subject(_) => Err(ContractError::NotAPayment(id.clone())),
    }
}

fn payment_exists(store: &mut dyn StateStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
    expect_args("PaymentExists", args, 1)?;
    let found = record_exists(&*store, &args[0]);
    Ok(if found { b"true".to_vec() } else { b"false".to_vec() })
}

/// Full-range listing. Entries that fail to parse degrade to their raw text
/// instead of failing the scan. An optional single argument filters by the
/// `docType` tag.
fn get_all_assets(store: &mut dyn StateStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
    if args.len() > 1 {
        return Err(ContractError::TooManyArguments {
            transaction: "GetAllAssets".to_string(),
            max: 1,
            actual: args.len(),
        });
    }
    let filter = args.first().map(String::as_str);
    let mut results: Vec<Value> = Vec::new();
    for (_, value) in store.range_scan(b"", b"") {
        match serde_json::from_slice::<Value>(&value) {
            Ok(parsed) => {
                if let Some(kind) = filter {
                    if parsed.get("docType").and_then(Value::as_str) != Some(kind) {
                        continue;
                    }
                }
                results.push(parsed);
            }
            Err(_) => {
                if filter.is_none() {
                    results.push(Value::String(String::from_utf8_lossy(&value).into_owned()));
                }
            }
        }
    }
    Ok(serde_json::to_vec(&results)?)
}

fn payment_from_args(args: &[String]) -> Result<Payment, ContractError> {
    let total = args[6]
        .parse::<f64>()
        .map_err(|e| ContractError::InvalidArgument {
            name: "paymentTotal",
            reason: e.to_string(),
        })?;
    Ok(Payment {
        payment_id: args[0].clone(),
        order_id: args[1].clone(),
        payment_type: args[2].clone(),
        payment_date_time: args[3].clone(),
        payment_receipt_uri: args[4].clone(),
        payment_receipt_hash: args[5].clone(),
        payment_total: total,
        owner: None,
    })
}
