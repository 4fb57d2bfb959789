use serde::{Deserialize, Serialize};

/// A ledger record. Payments and subjects share one key space; the `docType`
/// tag tells them apart in stored form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "docType")]
pub enum Record {
    #[serde(rename = "payment")]
    Payment(Payment),
    #[serde(rename = "subject")]
    Subject(Subject),
}

impl Record {
    /// The ledger key this record lives under.
    pub fn key(&self) -> &str {
        match self {
            Record::Payment(p) => &p.payment_id,
            Record::Subject(s) => &s.user_id,
        }
    }

    pub fn doc_type(&self) -> &'static str {
        match self {
            Record::Payment(_) => "payment",
            Record::Subject(_) => "subject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "paymentID")]
    pub payment_id: String,
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(rename = "paymentType")]
    pub payment_type: String,
    /// ISO-8601 string supplied by the caller; never re-rendered locally.
    #[serde(rename = "paymentDateTime")]
    pub payment_date_time: String,
    #[serde(rename = "paymentReceiptURI")]
    pub payment_receipt_uri: String,
    #[serde(rename = "paymentReceiptHash")]
    pub payment_receipt_hash: String,
    #[serde(rename = "paymentTotal")]
    pub payment_total: f64,
    /// Absent until the first transfer.
    #[serde(rename = "Owner", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub username: String,
    #[serde(rename = "taxPayerID")]
    pub tax_payer_id: String,
}
