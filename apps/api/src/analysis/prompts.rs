//! Fixed instruction prompts, one per trigger button. Constant for the
//! process lifetime; selection is a pure function of the pressed trigger.

use std::str::FromStr;

/// Instruction for the qualitative resume review trigger.
pub const RESUME_REVIEW_PROMPT: &str = "\
You are an experienced HR with tech expertise in AI, ML, Data Science, DevOps, Data Engineering, or Software Development. \
Review the resume and job description. Provide a detailed analysis of the candidate's skills, experience, and qualifications, \
highlighting matches and gaps. Mention if the profile aligns with the role, and list missing skills or experience if any.";

/// Instruction for the percentage-match trigger. Asks for a score, missing
/// and extra keywords, and a recommendation gated at 80%.
pub const MATCH_REPORT_PROMPT: &str = "\
You are a skilled ATS (Applicant Tracking System) analyzer with expertise in Data Science, AI, ML, DevOps, Data Engineering, and Software Development. \
Compare the resume with the job description and return:
1. A percentage match.
2. Missing keywords or skills.
3. Extra keywords found in the resume but not in the job description.
4. If the fit is above 80%, state it's a good fit; otherwise, suggest improvements.";

/// Which trigger button was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    ResumeReview,
    MatchReport,
}

impl AnalysisKind {
    pub fn instruction(self) -> &'static str {
        match self {
            AnalysisKind::ResumeReview => RESUME_REVIEW_PROMPT,
            AnalysisKind::MatchReport => MATCH_REPORT_PROMPT,
        }
    }

    /// Heading shown above the model's response.
    pub fn heading(self) -> &'static str {
        match self {
            AnalysisKind::ResumeReview => "Resume Analysis:",
            AnalysisKind::MatchReport => "ATS Match Result:",
        }
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "review" => Ok(AnalysisKind::ResumeReview),
            "match" => Ok(AnalysisKind::MatchReport),
            other => Err(format!(
                "unknown analysis kind '{other}' (expected 'review' or 'match')"
            )),
        }
    }
}
