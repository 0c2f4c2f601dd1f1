//! Carries input, settings and results between the steps of one workflow.

use crate::columns::Field;
use crate::engine::{compute_mapped, Calculation};
use crate::error::{EvmError, Result};
use crate::settings::GlobalSettings;
use crate::types::InputTable;

#[derive(Debug, Clone, Default)]
pub struct Session {
    raw_input: Option<InputTable>,
    mapping: Vec<(Field, String)>,
    settings: Option<GlobalSettings>,
    result: Option<Calculation>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the input and discards any earlier result.
    pub fn load_input(&mut self, table: InputTable) {
        self.raw_input = Some(table);
        self.result = None;
    }

    pub fn set_mapping(&mut self, mapping: Vec<(Field, String)>) {
        self.mapping = mapping;
        self.result = None;
    }

    /// Replaces the settings and discards any earlier result.
    pub fn configure(&mut self, settings: GlobalSettings) {
        self.settings = Some(settings);
        self.result = None;
    }

    pub fn raw_input(&self) -> Option<&InputTable> {
        self.raw_input.as_ref()
    }

    pub fn settings(&self) -> Option<&GlobalSettings> {
        self.settings.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.raw_input.is_some() && self.settings.is_some()
    }

    /// Runs the pipeline on the stored input. The input itself is untouched.
    pub fn calculate(&mut self) -> Result<&Calculation> {
        let table = self
            .raw_input
            .as_ref()
            .ok_or(EvmError::SessionNotReady { missing: "input data" })?;
        let settings = self
            .settings
            .as_ref()
            .ok_or(EvmError::SessionNotReady { missing: "settings" })?;
        let calculation = compute_mapped(table, settings, &self.mapping)?;
        Ok(self.result.insert(calculation))
    }

    pub fn result(&self) -> Option<&Calculation> {
        self.result.as_ref()
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }
}
