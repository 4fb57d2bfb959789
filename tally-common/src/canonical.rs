//! Canonical record encoding.
//!
//! Every replica must store byte-identical values for logically identical
//! records, so content hashes agree without shipping the records around.
//! Encoding goes through `serde_json::Value`, whose object type is a BTreeMap:
//! keys come out sorted at every nesting level, and the compact rendering has
//! no whitespace or locale-dependent formatting.

use serde::Serialize;

pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    Ok(value.to_string().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Payment, Record, Subject};
    use serde_json::{Map, Value};

    fn sample_payment() -> Payment {
        Payment {
            payment_id: "payment1".into(),
            order_id: "ord1".into(),
            payment_type: "contanti".into(),
            payment_date_time: "2023-06-02T00:00:00.000Z".into(),
            payment_receipt_uri: "Tomoko.com".into(),
            payment_receipt_hash: "Tomoko".into(),
            payment_total: 300.0,
            owner: None,
        }
    }

    #[test]
    fn insertion_order_does_not_leak() {
        let mut forward = Map::new();
        forward.insert("alpha".to_string(), Value::from(1));
        forward.insert("beta".to_string(), Value::from("x"));

        let mut backward = Map::new();
        backward.insert("beta".to_string(), Value::from("x"));
        backward.insert("alpha".to_string(), Value::from(1));

        assert_eq!(
            to_canonical_bytes(&forward).unwrap(),
            to_canonical_bytes(&backward).unwrap()
        );
    }

    #[test]
    fn nested_maps_are_sorted() {
        let mut inner = Map::new();
        inner.insert("zz".to_string(), Value::from(2));
        inner.insert("aa".to_string(), Value::from(1));
        let mut outer = Map::new();
        outer.insert("nested".to_string(), Value::Object(inner));
        outer.insert("first".to_string(), Value::from(0));

        let bytes = to_canonical_bytes(&outer).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"first":0,"nested":{"aa":1,"zz":2}}"#
        );
    }

    #[test]
    fn equal_records_encode_identically() {
        let a = Record::Payment(sample_payment());
        let b = Record::Payment(sample_payment());
        assert_eq!(
            to_canonical_bytes(&a).unwrap(),
            to_canonical_bytes(&b).unwrap()
        );
    }

    #[test]
    fn payment_keys_are_sorted_and_tagged() {
        let bytes = to_canonical_bytes(&Record::Payment(sample_payment())).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            concat!(
                r#"{"docType":"payment","orderID":"ord1","paymentDateTime":"2023-06-02T00:00:00.000Z","#,
                r#""paymentID":"payment1","paymentReceiptHash":"Tomoko","paymentReceiptURI":"Tomoko.com","#,
                r#""paymentTotal":300.0,"paymentType":"contanti"}"#
            )
        );
    }

    #[test]
    fn absent_owner_is_omitted() {
        let without = to_canonical_bytes(&Record::Payment(sample_payment())).unwrap();
        assert!(!String::from_utf8(without).unwrap().contains("Owner"));

        let mut transferred = sample_payment();
        transferred.owner = Some("Saptha".into());
        let with = to_canonical_bytes(&Record::Payment(transferred)).unwrap();
        assert!(String::from_utf8(with).unwrap().contains(r#""Owner":"Saptha""#));
    }

    #[test]
    fn subject_round_trips_through_canonical_form() {
        let subject = Record::Subject(Subject {
            user_id: "subject1".into(),
            username: "Aldo".into(),
            tax_payer_id: "A1".into(),
        });
        let bytes = to_canonical_bytes(&subject).unwrap();
        let back: Record = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, subject);
    }
}
