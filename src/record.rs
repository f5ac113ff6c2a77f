//! Record types flowing through the engine.

use serde::{Deserialize, Serialize};

/// A record addressable by its partition key.
///
/// The engine only needs the key to route a record to its partition and to
/// attribute failures; everything else about the record is opaque to it.
pub trait Keyed {
    fn key(&self) -> i64;
}

/// One customer row as read from the input file.
///
/// Identity is `id`. Uniqueness is expected but not checked at parse time;
/// duplicate handling belongs to the destination store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub contact_no: String,
    pub country: String,
    pub dob: String,
}

impl Customer {
    /// Column order of the delimited input.
    pub const COLUMNS: [&'static str; 8] = [
        "id",
        "firstName",
        "lastName",
        "email",
        "gender",
        "contactNo",
        "country",
        "dob",
    ];
}

impl Keyed for Customer {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for i64 {
    fn key(&self) -> i64 {
        *self
    }
}
