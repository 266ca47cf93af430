//! Wire schemas for the backend REST API (serde ready).
//! Keep this aligned with the backend documentation so both sides can evolve
//! independently; every response body is validated against these shapes at
//! the network boundary and a mismatch surfaces as a malformed-response
//! error instead of an undefined-field bug downstream.

use serde::{Deserialize, Serialize};

use crate::domain::{Difficulty, Level, Practice, Question};

/// Error body the backend sends with non-2xx statuses.
/// `error` is the stable machine-readable code; `message` the human text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Query parameters accepted by the list endpoints. `None` means "no filter"
/// for that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

//
// Questions
//

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionsResponse {
    pub success: bool,
    pub count: u32,
    #[serde(rename = "hasPremium")]
    pub has_premium: bool,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionResponse {
    pub success: bool,
    pub question: Question,
}

//
// Practices
//

#[derive(Debug, Clone, Deserialize)]
pub struct PracticesResponse {
    pub success: bool,
    pub count: u32,
    #[serde(rename = "hasPremium")]
    pub has_premium: bool,
    pub practices: Vec<Practice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PracticeResponse {
    pub success: bool,
    pub practice: Practice,
}

//
// Answer submission / attempt reset
//

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerRequest {
    #[serde(rename = "selectedAnswer")]
    pub selected_answer: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerResponse {
    pub success: bool,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetAttemptsResponse {
    pub success: bool,
    #[serde(rename = "deletedAttempts")]
    pub deleted_attempts: u32,
}

//
// Auth
//

#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedUser {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyAuthResponse {
    pub success: bool,
    pub user: VerifiedUser,
}

//
// Subscriptions
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Free,
    Premium,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionRecord {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub user_id: Option<u64>,
    /// "inactive" | "active" | "cancelled"; kept as text because the payment
    /// provider may introduce states we don't know about.
    pub status: String,
    pub plan_type: PlanType,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl SubscriptionRecord {
    /// The only combination that unlocks premium content.
    pub fn is_premium_active(&self) -> bool {
        self.status == "active" && self.plan_type == PlanType::Premium
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionStatusResponse {
    pub success: bool,
    pub subscription: SubscriptionRecord,
}

/// The payment provider returns the checkout id as either a number or text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CheckoutId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutResponse {
    pub success: bool,
    pub checkout_url: String,
    pub checkout_id: CheckoutId,
}

//
// Dashboard
//

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardTotals {
    #[serde(rename = "completedQuestions")]
    pub completed_questions: u32,
    #[serde(rename = "freeQuestionsUsed")]
    pub free_questions_used: u32,
    #[serde(rename = "freeQuestionLimit")]
    pub free_question_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardStreak {
    #[serde(rename = "currentDays")]
    pub current_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardTiming {
    #[serde(rename = "avgTimeMinutes")]
    pub avg_time_minutes: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelProgress {
    pub level: Level,
    pub completed: u32,
    pub total: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopLanguage {
    pub language: String,
    pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentActivity {
    pub id: u64,
    pub title: String,
    pub language: String,
    pub level: Level,
    pub difficulty: Difficulty,
    #[serde(rename = "attemptedAt")]
    pub attempted_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendedQuestion {
    pub id: u64,
    pub title: String,
    pub language: String,
    pub level: Level,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardData {
    pub totals: DashboardTotals,
    pub streak: DashboardStreak,
    pub timing: DashboardTiming,
    #[serde(rename = "progressByLevel")]
    pub progress_by_level: Vec<LevelProgress>,
    #[serde(rename = "topLanguages")]
    pub top_languages: Vec<TopLanguage>,
    #[serde(rename = "recentActivity")]
    pub recent_activity: Vec<RecentActivity>,
    #[serde(rename = "recommendedNext")]
    pub recommended_next: Vec<RecommendedQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub dashboard: DashboardData,
}
