//! Answer submission lifecycle for a single catalog item.
//!
//! Grading is server-owned: the flow sends the selected index and adopts
//! whatever verdict and correct answer come back, even when the item payload
//! already carried a correct answer locally. A successful submit marks the
//! owning family stale so list overlays refresh; a failed submit reverts to
//! unanswered with the selection intact for retry.

use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::auth::IdentityProvider;
use crate::domain::{Practice, Question};
use crate::error::{ApiError, ApiResult};
use crate::store::AppStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Questions,
    Practices,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptPhase {
    Unanswered,
    Submitting,
    Graded {
        is_correct: bool,
        correct_answer: usize,
    },
}

#[derive(Clone, Debug)]
pub struct AttemptFlow {
    pub item_id: u64,
    pub family: Family,
    pub selected: Option<usize>,
    pub phase: AttemptPhase,
    pub explanation: Option<String>,
}

impl AttemptFlow {
    pub fn new(item_id: u64, family: Family) -> Self {
        Self {
            item_id,
            family,
            selected: None,
            phase: AttemptPhase::Unanswered,
            explanation: None,
        }
    }

    /// Rebuild the flow from a previously attempted question so reopening an
    /// item shows the recorded verdict instead of a fresh prompt.
    pub fn hydrate_question(question: &Question) -> Self {
        let mut flow = Self::new(question.id, Family::Questions);
        flow.selected = question.user_selected_answer;
        flow.explanation = question.explanation.clone();
        if question.show_answer {
            if let Some(correct) = question.correct_answer {
                let is_correct = question
                    .user_is_correct
                    .or(question.is_correct)
                    .unwrap_or(false);
                flow.phase = AttemptPhase::Graded {
                    is_correct,
                    correct_answer: correct,
                };
            }
        }
        flow
    }

    pub fn hydrate_practice(practice: &Practice) -> Self {
        let mut flow = Self::new(practice.id, Family::Practices);
        flow.selected = practice.user_selected_answer;
        flow.explanation = practice.explanation.clone();
        if practice.show_answer {
            if let Some(correct) = practice.correct_answer {
                let is_correct = practice
                    .user_is_correct
                    .or(practice.is_correct)
                    .unwrap_or(false);
                flow.phase = AttemptPhase::Graded {
                    is_correct,
                    correct_answer: correct,
                };
            }
        }
        flow
    }

    pub fn is_graded(&self) -> bool {
        matches!(self.phase, AttemptPhase::Graded { .. })
    }

    /// Pick an option. Ignored once graded; the verdict is final until the
    /// account's attempts are reset server-side.
    pub fn select(&mut self, option: usize) {
        if self.is_graded() {
            return;
        }
        self.selected = Some(option);
    }

    /// Submit the selection for grading. Validation failures (nothing
    /// selected, already graded) are rejected locally without any request.
    #[instrument(level = "info", skip(self, api, store), fields(item_id = self.item_id, family = ?self.family))]
    pub async fn submit<P: IdentityProvider>(
        &mut self,
        api: &ApiClient<P>,
        store: &AppStore,
    ) -> ApiResult<()> {
        if self.is_graded() {
            return Err(ApiError::Validation("Answer already submitted".into()));
        }
        let selected = self
            .selected
            .ok_or_else(|| ApiError::Validation("Please select an answer".into()))?;

        self.phase = AttemptPhase::Submitting;
        let result = match self.family {
            Family::Questions => api.submit_question_answer(self.item_id, selected).await,
            Family::Practices => api.submit_practice_answer(self.item_id, selected).await,
        };

        match result {
            Ok(res) => {
                self.phase = AttemptPhase::Graded {
                    is_correct: res.is_correct,
                    correct_answer: res.correct_answer,
                };
                if res.explanation.is_some() {
                    self.explanation = res.explanation;
                }
                match self.family {
                    Family::Questions => store.bump_questions_refresh(),
                    Family::Practices => store.bump_practices_refresh(),
                };
                info!(
                    target: "prepdeck",
                    correct = matches!(self.phase, AttemptPhase::Graded { is_correct: true, .. }),
                    "Attempt graded"
                );
                Ok(())
            }
            Err(e) => {
                // Keep the selection so the user can retry without re-picking.
                self.phase = AttemptPhase::Unanswered;
                warn!(target: "prepdeck", error = %e, "Attempt submission failed");
                Err(e)
            }
        }
    }
}
