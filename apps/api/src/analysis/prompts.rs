// Resume analysis prompt templates.
// The response format descriptor is a contract with the model: keep it stable
// so stored feedback always has the same shape.

pub const AI_RESPONSE_FORMAT: &str = r#"interface Feedback {
  overallScore: number; // max 100
  ATS: {
    score: number; // rate based on ATS suitability
    tips: {
      type: "good" | "improve";
      tip: string; // give 3-4 tips
    }[];
  };
  toneAndStyle: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string; // make it a short "title" for the actual explanation
      explanation: string; // explain in detail here
    }[]; // give 3-4 tips
  };
  content: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string;
      explanation: string;
    }[];
  };
  structure: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string;
      explanation: string;
    }[];
  };
  skills: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string;
      explanation: string;
    }[];
  };
}"#;

pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are an expert in ATS (Applicant Tracking Systems) and resume analysis.
Analyze and rate the attached resume and suggest how to improve it.
Be thorough and honest: if the resume is weak, give it a low score.
Point out every mistake and area for improvement you find.
Use the job description, when one is given, to judge fit for the role.

JOB TITLE:
{job_title}

JOB DESCRIPTION:
{job_description}

Provide the feedback using this format:
{response_format}

Return the analysis as a JSON object only, with no other text and no backticks."#;

/// Renders the instruction payload sent with the stored resume.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{response_format}", AI_RESPONSE_FORMAT)
        .replace("{job_title}", job_title)
        .replace("{job_description}", job_description)
}
