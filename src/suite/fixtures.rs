use crate::model::{ObjectPatch, ObjectPayload};
use serde_json::{Value, json};

/// Ids of two catalog objects, in the order the filtered listing is asked for them.
pub const CATALOG_IDS: [&str; 2] = ["1", "3"];

fn laptop_data() -> Value {
    json!({
        "year": 2019,
        "price": 1849.99,
        "CPU model": "Intel Core i9",
        "Hard disk size": "1 TB"
    })
}

/// Bodies used by the create cases; the first one also seeds the shared object.
pub fn create_bodies() -> Vec<ObjectPayload> {
    ["Apple MacBook Pro 19", "LG TV PC CONSOLE 4 in 1", "Lenovo ThinkPad"]
        .into_iter()
        .map(|name| ObjectPayload::new(name, laptop_data()))
        .collect()
}

pub fn shared_object_body() -> ObjectPayload {
    ObjectPayload::new("Apple MacBook Pro 19", laptop_data())
}

pub fn full_update_body() -> ObjectPayload {
    ObjectPayload::new(
        "Samsung MacBook Pro 19",
        json!({
            "year": 3019,
            "price": 1849.99,
            "CPU model": "Intel Core i99",
            "Hard disk size": "3 TB"
        }),
    )
}

pub fn partial_update_body() -> ObjectPatch {
    ObjectPatch::name("Xiaomi MacBook Pro 19")
}
