use serde_json::{Value, json};

/// The read-only objects the public service ships with, ids "1" to "13".
pub fn catalog() -> Vec<(&'static str, &'static str, Value)> {
    vec![
        (
            "1",
            "Google Pixel 6 Pro",
            json!({"color": "Cloudy White", "capacity": "128 GB"}),
        ),
        ("2", "Apple iPhone 12 Mini, 256GB, Blue", Value::Null),
        (
            "3",
            "Apple iPhone 12 Pro Max",
            json!({"color": "Cloudy White", "capacity GB": 512}),
        ),
        (
            "4",
            "Apple iPhone 11, 64GB",
            json!({"price": 389.99, "color": "Purple"}),
        ),
        (
            "5",
            "Samsung Galaxy Z Fold2",
            json!({"price": 689.99, "color": "Brown"}),
        ),
        (
            "6",
            "Apple AirPods",
            json!({"generation": "3rd", "price": 120}),
        ),
        (
            "7",
            "Apple MacBook Pro 16",
            json!({
                "year": 2019,
                "price": 1849.99,
                "CPU model": "Intel Core i9",
                "Hard disk size": "1 TB"
            }),
        ),
        (
            "8",
            "Apple Watch Series 8",
            json!({"Strap Colour": "Elderberry", "Case Size": "41mm"}),
        ),
        (
            "9",
            "Beats Studio3 Wireless",
            json!({
                "Color": "Red",
                "Description": "High-performance wireless noise cancelling headphones"
            }),
        ),
        (
            "10",
            "Apple iPad Mini 5th Gen",
            json!({"Capacity": "64 GB", "Screen size": 7.9}),
        ),
        (
            "11",
            "Apple iPad Mini 5th Gen",
            json!({"Capacity": "254 GB", "Screen size": 7.9}),
        ),
        (
            "12",
            "Apple iPad Air",
            json!({"Generation": "4th", "Price": "419.99", "Capacity": "64 GB"}),
        ),
        (
            "13",
            "Apple iPad Air",
            json!({"Generation": "4th", "Price": "519.99", "Capacity": "256 GB"}),
        ),
    ]
}
