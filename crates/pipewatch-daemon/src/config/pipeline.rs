use serde::{Deserialize, Serialize};

use super::constants::{
    DEFAULT_PIPELINE_PROGRAM, DEFAULT_PIPELINE_SCRIPT, FEATURE_FLAG, RESUME_FLAG,
};

/// How the supervised pipeline executable is invoked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineCommand {
    pub program: String,
    pub args: Vec<String>,
    pub resume_flag: String,
    pub feature_flag: String,
}

impl Default for PipelineCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_PIPELINE_PROGRAM.to_string(),
            args: vec![DEFAULT_PIPELINE_SCRIPT.to_string()],
            resume_flag: RESUME_FLAG.to_string(),
            feature_flag: FEATURE_FLAG.to_string(),
        }
    }
}

impl PipelineCommand {
    pub fn with_script(script: &str) -> Self {
        Self {
            args: vec![script.to_string()],
            ..Default::default()
        }
    }

    pub fn arguments(&self, resume: bool, feature: Option<&str>) -> Vec<String> {
        let mut args = self.args.clone();
        if resume {
            args.push(self.resume_flag.clone());
        }
        if let Some(feature) = feature {
            args.push(self.feature_flag.clone());
            args.push(feature.to_string());
        }
        args
    }

    pub fn display(&self, resume: bool, feature: Option<&str>) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.arguments(resume, feature));
        parts.join(" ")
    }
}
