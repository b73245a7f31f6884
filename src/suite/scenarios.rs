use super::fixtures;
use super::report::{Outcome, ScenarioResult, SuiteReport};
use crate::client::{ApiResponse, ObjectsClient};
use crate::errors::CheckError;
use crate::freshness::FreshnessCheck;
use crate::metrics::SharedMetrics;
use crate::model::{ApiObject, DeleteConfirmation};
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use std::time::Instant;
use tracing::{error, info};

/// Severity tag used to select a subset of scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Marker {
    Critical,
    Medium,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Critical => f.write_str("critical"),
            Marker::Medium => f.write_str("medium"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    GetAllObjects,
    GetObjectsById,
    GetObjectById,
    /// One case per create body
    AddObject(usize),
    UpdateAllObject,
    UpdatePartiallyObject,
    DeleteObjectById,
}

impl Scenario {
    /// Every scenario in run order; the delete runs last since it removes the shared object.
    pub fn all() -> Vec<Scenario> {
        let mut scenarios = vec![
            Scenario::GetAllObjects,
            Scenario::GetObjectsById,
            Scenario::GetObjectById,
        ];
        scenarios.extend((0..fixtures::create_bodies().len()).map(Scenario::AddObject));
        scenarios.extend([
            Scenario::UpdateAllObject,
            Scenario::UpdatePartiallyObject,
            Scenario::DeleteObjectById,
        ]);
        scenarios
    }

    pub fn name(&self) -> String {
        match self {
            Scenario::GetAllObjects => "get_all_objects".to_string(),
            Scenario::GetObjectsById => "get_objects_by_id".to_string(),
            Scenario::GetObjectById => "get_object_by_id".to_string(),
            Scenario::AddObject(case) => format!("add_object[{case}]"),
            Scenario::UpdateAllObject => "update_all_object".to_string(),
            Scenario::UpdatePartiallyObject => "update_partially_object".to_string(),
            Scenario::DeleteObjectById => "delete_object_by_id".to_string(),
        }
    }

    pub fn marker(&self) -> Option<Marker> {
        match self {
            Scenario::AddObject(_) => Some(Marker::Critical),
            Scenario::UpdateAllObject => Some(Marker::Medium),
            _ => None,
        }
    }
}

/// Which scenarios a run executes. Everything else is reported as skipped.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub marker: Option<Marker>,
    pub filter: Option<String>,
}

impl Selection {
    pub fn includes(&self, scenario: &Scenario) -> bool {
        if let Some(marker) = self.marker {
            if scenario.marker() != Some(marker) {
                return false;
            }
        }
        match &self.filter {
            Some(filter) => scenario.name().contains(filter.as_str()),
            None => true,
        }
    }
}

/// Runs the CRUD scenarios one after another against an objects API.
pub struct Suite {
    client: ObjectsClient,
    freshness: FreshnessCheck,
    metrics: Option<SharedMetrics>,
    // Created on first use, shared by the read/update/delete scenarios
    shared: Option<ApiObject>,
}

impl Suite {
    pub fn new(client: ObjectsClient, freshness: FreshnessCheck) -> Self {
        Self {
            client,
            freshness,
            metrics: None,
            shared: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn run(&mut self, selection: &Selection) -> SuiteReport {
        let started = Instant::now();
        let mut report = SuiteReport::default();

        info!(base_url = %self.client.base_url(), "Start testing");

        for scenario in Scenario::all() {
            let name = scenario.name();
            let marker = scenario.marker();

            if !selection.includes(&scenario) {
                report.push(ScenarioResult {
                    name,
                    marker,
                    outcome: Outcome::Skipped,
                    duration: Default::default(),
                });
                continue;
            }

            info!(scenario = %name, "before test");
            let scenario_started = Instant::now();

            let outcome = match self.run_scenario(scenario).await {
                Ok(()) => Outcome::Passed,
                Err(e) => {
                    error!(scenario = %name, error = %e, "Check failed");
                    Outcome::Failed(e.to_string())
                }
            };

            let duration = scenario_started.elapsed();
            info!(
                scenario = %name,
                outcome = outcome.label(),
                elapsed_ms = duration.as_millis(),
                "after test"
            );

            if let Some(metrics) = &self.metrics {
                metrics.record_check(outcome.label());
            }

            report.push(ScenarioResult {
                name,
                marker,
                outcome,
                duration,
            });
        }

        report.elapsed = started.elapsed();
        info!(summary = %report.summary(), "Testing completed");
        report
    }

    pub async fn run_scenario(&mut self, scenario: Scenario) -> Result<(), CheckError> {
        match scenario {
            Scenario::GetAllObjects => self.get_all_objects().await,
            Scenario::GetObjectsById => self.get_objects_by_id().await,
            Scenario::GetObjectById => self.get_object_by_id().await,
            Scenario::AddObject(case) => self.add_object(case).await,
            Scenario::UpdateAllObject => self.update_all_object().await,
            Scenario::UpdatePartiallyObject => self.update_partially_object().await,
            Scenario::DeleteObjectById => self.delete_object_by_id().await,
        }
    }

    async fn shared_object_id(&mut self) -> Result<String, CheckError> {
        if let Some(object) = &self.shared {
            return Ok(object.id.clone());
        }

        let response = self.client.create(&fixtures::shared_object_body()).await?;
        expect_status("POST /objects (fixture)", &response, StatusCode::OK)?;
        let object: ApiObject = response.json()?;

        info!(id = %object.id, "Created shared object");
        let id = object.id.clone();
        self.shared = Some(object);
        Ok(id)
    }

    async fn get_all_objects(&mut self) -> Result<(), CheckError> {
        let response = self.client.list_all().await?;
        expect_status("GET /objects", &response, StatusCode::OK)?;

        let objects: Vec<Value> = response.json()?;
        if objects.len() <= 1 {
            return Err(CheckError::Assertion(format!(
                "expected more than one object, got {}",
                objects.len()
            )));
        }
        Ok(())
    }

    async fn get_objects_by_id(&mut self) -> Result<(), CheckError> {
        let response = self.client.list_by_ids(&fixtures::CATALOG_IDS).await?;
        expect_status("GET /objects?id=..", &response, StatusCode::OK)?;

        let objects: Vec<ApiObject> = response.json()?;
        let ids: Vec<&str> = objects.iter().map(|o| o.id.as_str()).collect();
        if ids.len() < fixtures::CATALOG_IDS.len()
            || ids[..fixtures::CATALOG_IDS.len()] != fixtures::CATALOG_IDS
        {
            return Err(CheckError::mismatch(
                "ids",
                fixtures::CATALOG_IDS.join(","),
                ids.join(","),
            ));
        }
        Ok(())
    }

    async fn get_object_by_id(&mut self) -> Result<(), CheckError> {
        let id = self.shared_object_id().await?;

        let response = self.client.get(&id).await?;
        expect_status("GET /objects/{id}", &response, StatusCode::OK)?;

        let object: ApiObject = response.json()?;
        expect_eq("id", &id, &object.id)
    }

    async fn add_object(&mut self, case: usize) -> Result<(), CheckError> {
        let bodies = fixtures::create_bodies();
        let body = bodies
            .get(case)
            .ok_or_else(|| CheckError::Assertion(format!("no create body for case {case}")))?;

        let response = self.client.create(body).await?;
        expect_status("POST /objects", &response, StatusCode::OK)?;

        let object: ApiObject = response.json()?;
        if object.id.is_empty() {
            return Err(CheckError::Missing { field: "id" });
        }
        self.expect_fresh("createdAt", object.created_at.as_deref())
    }

    async fn update_all_object(&mut self) -> Result<(), CheckError> {
        let id = self.shared_object_id().await?;
        let body = fixtures::full_update_body();

        let response = self.client.update(&id, &body).await?;
        expect_status("PUT /objects/{id}", &response, StatusCode::OK)?;

        let object: ApiObject = response.json()?;
        expect_eq("id", &id, &object.id)?;
        expect_eq("name", &body.name, required("name", object.name.as_ref())?)?;

        let expected_data = body.data.map(Value::Object).unwrap_or(Value::Null);
        expect_eq(
            "data",
            &expected_data,
            object.data.as_ref().unwrap_or(&Value::Null),
        )?;

        self.expect_fresh("updatedAt", object.updated_at.as_deref())
    }

    async fn update_partially_object(&mut self) -> Result<(), CheckError> {
        let id = self.shared_object_id().await?;
        let body = fixtures::partial_update_body();

        let response = self.client.patch(&id, &body).await?;
        expect_status("PATCH /objects/{id}", &response, StatusCode::OK)?;

        let object: ApiObject = response.json()?;
        expect_eq("id", &id, &object.id)?;
        if let Some(name) = &body.name {
            expect_eq("name", name, required("name", object.name.as_ref())?)?;
        }

        self.expect_fresh("updatedAt", object.updated_at.as_deref())
    }

    async fn delete_object_by_id(&mut self) -> Result<(), CheckError> {
        let id = self.shared_object_id().await?;

        let response = self.client.delete(&id).await?;
        expect_status("DELETE /objects/{id}", &response, StatusCode::OK)?;

        let confirmation: DeleteConfirmation = response.json()?;
        self.shared = None;
        expect_eq(
            "message",
            &DeleteConfirmation::for_id(&id).message,
            &confirmation.message,
        )
    }

    fn expect_fresh(&self, field: &'static str, value: Option<&str>) -> Result<(), CheckError> {
        let value = value.ok_or(CheckError::Missing { field })?;

        if self.freshness.is_fresh(value)? {
            Ok(())
        } else {
            Err(CheckError::Stale {
                field,
                value: value.to_string(),
                tolerance_secs: self.freshness.tolerance().num_seconds(),
            })
        }
    }
}

fn expect_status(
    operation: &'static str,
    response: &ApiResponse,
    expected: StatusCode,
) -> Result<(), CheckError> {
    if response.status == expected {
        return Ok(());
    }
    Err(CheckError::Status {
        operation,
        expected: expected.as_u16(),
        actual: response.status.as_u16(),
    })
}

fn expect_eq<T>(field: &'static str, expected: &T, actual: &T) -> Result<(), CheckError>
where
    T: PartialEq + fmt::Display + ?Sized,
{
    if expected == actual {
        Ok(())
    } else {
        Err(CheckError::mismatch(field, expected, actual))
    }
}

fn required<'a, T>(field: &'static str, value: Option<&'a T>) -> Result<&'a T, CheckError> {
    value.ok_or(CheckError::Missing { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_run_order() {
        let names: Vec<String> = Scenario::all().iter().map(Scenario::name).collect();
        assert_eq!(
            names,
            vec![
                "get_all_objects",
                "get_objects_by_id",
                "get_object_by_id",
                "add_object[0]",
                "add_object[1]",
                "add_object[2]",
                "update_all_object",
                "update_partially_object",
                "delete_object_by_id",
            ]
        );
    }

    #[test]
    fn test_selection_by_marker_and_filter() {
        let critical = Selection {
            marker: Some(Marker::Critical),
            filter: None,
        };
        let selected: Vec<Scenario> = Scenario::all()
            .into_iter()
            .filter(|s| critical.includes(s))
            .collect();
        assert_eq!(
            selected,
            vec![
                Scenario::AddObject(0),
                Scenario::AddObject(1),
                Scenario::AddObject(2)
            ]
        );

        let by_name = Selection {
            marker: None,
            filter: Some("update".to_string()),
        };
        assert!(by_name.includes(&Scenario::UpdateAllObject));
        assert!(by_name.includes(&Scenario::UpdatePartiallyObject));
        assert!(!by_name.includes(&Scenario::GetAllObjects));

        let both = Selection {
            marker: Some(Marker::Medium),
            filter: Some("partially".to_string()),
        };
        assert!(Scenario::all().iter().all(|s| !both.includes(s)));
    }

    #[test]
    fn test_expect_helpers() {
        let ok = ApiResponse {
            status: StatusCode::OK,
            body: json!({}),
        };
        assert!(expect_status("GET", &ok, StatusCode::OK).is_ok());
        assert!(matches!(
            expect_status("GET", &ok, StatusCode::CREATED),
            Err(CheckError::Status { actual: 200, .. })
        ));

        assert!(expect_eq("name", "a", "a").is_ok());
        assert!(expect_eq("data", &json!({"a": 1}), &json!({"a": 2})).is_err());
        assert!(matches!(
            required::<String>("name", None),
            Err(CheckError::Missing { field: "name" })
        ));
    }

    #[test]
    fn test_expect_fresh() {
        let client = ObjectsClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let suite = Suite::new(client, FreshnessCheck::default());

        let now = chrono::Utc::now().to_rfc3339();
        assert!(suite.expect_fresh("createdAt", Some(&now)).is_ok());
        assert!(matches!(
            suite.expect_fresh("createdAt", Some("2001-01-01T00:00:00Z")),
            Err(CheckError::Stale { tolerance_secs: 60, .. })
        ));
        assert!(matches!(
            suite.expect_fresh("createdAt", Some("garbage")),
            Err(CheckError::Timestamp(_))
        ));
        assert!(matches!(
            suite.expect_fresh("updatedAt", None),
            Err(CheckError::Missing { field: "updatedAt" })
        ));
    }

    #[test]
    fn test_unreachable_service_fails_every_selected_check() {
        let client = ObjectsClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let mut suite = Suite::new(client, FreshnessCheck::default());
        let selection = Selection {
            marker: Some(Marker::Critical),
            filter: None,
        };

        let report = tokio_test::block_on(suite.run(&selection));

        assert_eq!(report.failed(), 3);
        assert_eq!(report.skipped(), 6);
        assert!(!report.is_success());
    }
}
