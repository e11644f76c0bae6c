use serde::{Deserialize, Serialize};

use crate::aggregate::{canonical_semesters, AggregationOptions};
use crate::branch::BranchCode;
use crate::error::{LedgerError, Result};
use crate::kv::KvStore;
use crate::metrics::{self, AnalysisRequest, Gpa, MissingSgpaPolicy, SemesterSummary};
use crate::model::Semester;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SgpaPrediction {
    #[serde(default)]
    pub future_semesters: Vec<u32>,
    pub predicted_sgpas: Vec<f64>,
    pub performance_trend: String,
    pub slope: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthsWeaknesses {
    pub strengths: Vec<CategoryScore>,
    pub weaknesses: Vec<CategoryScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectiveRecommendations {
    pub reason: String,
    pub recommended_electives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializationRecommendations {
    pub reason: String,
    pub recommended_specializations: Vec<String>,
}

/// Response of the analysis service. A section is `None` when the service had
/// too little data for it (a prediction needs at least two SGPAs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub sgpa_prediction: Option<SgpaPrediction>,
    #[serde(default)]
    pub strengths_weaknesses: Option<StrengthsWeaknesses>,
    #[serde(default)]
    pub elective_recommendations: Option<ElectiveRecommendations>,
    #[serde(default)]
    pub specialization_recommendations: Option<SpecializationRecommendations>,
}

pub trait AnalysisClient {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse>;
}

/// Blocking JSON client. No retry and no timeout beyond the transport default.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpAnalysisClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.to_owned(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AnalysisClient for HttpAnalysisClient {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        tracing::info!(
            endpoint = %self.endpoint,
            semesters = request.semesters.len(),
            "requesting performance analysis"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<AnalysisResponse>());
        response.map_err(|e| {
            tracing::warn!(endpoint = %self.endpoint, error = %e, "performance analysis failed");
            LedgerError::from(e)
        })
    }
}

/// Everything the analyzer view computes locally before calling out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedAnalysis {
    #[serde(skip)]
    pub canonical: Vec<Semester>,
    pub semesters: Vec<SemesterSummary>,
    pub cgpa: Gpa,
    pub payload: AnalysisRequest,
}

pub fn prepare_analysis(
    kv: &dyn KvStore,
    user_email: &str,
    selected_branch: &BranchCode,
    opts: AggregationOptions,
    policy: MissingSgpaPolicy,
) -> Result<PreparedAnalysis> {
    let canonical = canonical_semesters(kv, user_email, selected_branch, opts)?;
    Ok(PreparedAnalysis {
        semesters: canonical.iter().map(metrics::semester_summary).collect(),
        cgpa: metrics::cgpa(&canonical, policy),
        payload: metrics::build_analysis_payload(&canonical),
        canonical,
    })
}

/// Chart-ready SGPA series: actual values, predictions, and the dashed
/// segment joining the last actual point to the first predicted one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub labels: Vec<String>,
    pub past: Vec<Option<f64>>,
    pub predicted: Vec<Option<f64>>,
    pub connection: Vec<Option<f64>>,
}

pub fn trend_series(canonical: &[Semester], prediction: &SgpaPrediction) -> TrendSeries {
    let mut sorted: Vec<&Semester> = canonical.iter().collect();
    sorted.sort_by_key(|s| s.number);

    let past_values: Vec<Option<f64>> = sorted
        .iter()
        .map(|s| metrics::sgpa(&s.subjects).value())
        .collect();
    let max_number = sorted.iter().map(|s| u32::from(s.number)).max().unwrap_or(0);
    let n_past = past_values.len();
    let n_future = prediction.predicted_sgpas.len();

    let labels: Vec<String> = sorted
        .iter()
        .map(|s| format!("S{}", s.number))
        .chain((1..=n_future as u32).map(|i| format!("S{}", max_number + i)))
        .collect();

    let mut past = past_values.clone();
    past.resize(n_past + n_future, None);

    let mut predicted = vec![None; n_past];
    predicted.extend(prediction.predicted_sgpas.iter().copied().map(Some));

    let mut connection = vec![None; n_past + n_future];
    if n_past > 0 && n_future > 0 {
        connection[n_past - 1] = past_values[n_past - 1];
        connection[n_past] = Some(prediction.predicted_sgpas[0]);
    }

    TrendSeries {
        labels,
        past,
        predicted,
        connection,
    }
}

pub fn trend_message(prediction: &SgpaPrediction) -> &'static str {
    if prediction.slope > 0.0 {
        "Keep up the good work!"
    } else if prediction.slope < 0.0 {
        "Consider focusing more on your studies to improve your grades."
    } else {
        "Your performance is consistent."
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    #[serde(flatten)]
    pub prepared: PreparedAnalysis,
    pub analysis: AnalysisResponse,
    pub trend: Option<TrendSeries>,
    pub trend_message: Option<&'static str>,
}

/// Local preparation followed by the remote call. The ledger is only read.
pub fn run_analysis(
    kv: &dyn KvStore,
    client: &dyn AnalysisClient,
    user_email: &str,
    selected_branch: &BranchCode,
    opts: AggregationOptions,
    policy: MissingSgpaPolicy,
) -> Result<AnalysisOutcome> {
    let prepared = prepare_analysis(kv, user_email, selected_branch, opts, policy)?;
    let analysis = client.analyze(&prepared.payload)?;
    let trend = analysis
        .sgpa_prediction
        .as_ref()
        .map(|p| trend_series(&prepared.canonical, p));
    let trend_message = analysis.sgpa_prediction.as_ref().map(trend_message);
    Ok(AnalysisOutcome {
        prepared,
        analysis,
        trend,
        trend_message,
    })
}
