//! Three-step form wizards.
//!
//! Step 1 and 2 collect input; step 3 shows the result and only becomes
//! valid once the analysis has completed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use vigitva_common::Period;

pub const FIRST_STEP: u8 = 1;
pub const LAST_STEP: u8 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Step {0} is incomplete")]
    Incomplete(u8),
    #[error("Already on the last step")]
    AtEnd,
}

/// Per-step validation of the data a wizard collects.
pub trait WizardForm {
    fn step1_valid(&self) -> bool;
    fn step2_valid(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMethod {
    #[default]
    File,
    Url,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceForm {
    pub company_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub upload_method: UploadMethod,
    pub file_name: Option<String>,
    pub url: Option<String>,
}

impl InvoiceForm {
    /// The file name or URL that will be attached to the analysis.
    pub fn source(&self) -> (Option<String>, Option<String>) {
        match self.upload_method {
            UploadMethod::File => (self.file_name.clone(), None),
            UploadMethod::Url => (None, self.url.as_deref().map(str::trim).map(String::from)),
        }
    }
}

impl WizardForm for InvoiceForm {
    fn step1_valid(&self) -> bool {
        self.company_id.is_some() && self.supplier_id.is_some()
    }

    fn step2_valid(&self) -> bool {
        match self.upload_method {
            UploadMethod::File => self.file_name.as_deref().is_some_and(|n| !n.is_empty()),
            UploadMethod::Url => self.url.as_deref().is_some_and(|u| !u.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentForm {
    pub file_name: Option<String>,
    pub company_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DocumentForm {
    pub fn period(&self) -> Option<Period> {
        Some(Period { start_date: self.start_date?, end_date: self.end_date? })
    }
}

impl WizardForm for DocumentForm {
    fn step1_valid(&self) -> bool {
        self.file_name.as_deref().is_some_and(|n| !n.is_empty())
    }

    fn step2_valid(&self) -> bool {
        self.company_id.is_some() && self.start_date.is_some() && self.end_date.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wizard<F> {
    pub form: F,
    step: u8,
    completed: bool,
}

impl<F: WizardForm + Default> Default for Wizard<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F: WizardForm> Wizard<F> {
    pub fn new(form: F) -> Self {
        Self { form, step: FIRST_STEP, completed: false }
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn is_step_valid(&self, step: u8) -> bool {
        match step {
            1 => self.form.step1_valid(),
            2 => self.form.step2_valid(),
            3 => self.completed,
            _ => false,
        }
    }

    pub fn next(&mut self) -> Result<u8, WizardError> {
        if self.step >= LAST_STEP {
            return Err(WizardError::AtEnd);
        }
        if !self.is_step_valid(self.step) {
            return Err(WizardError::Incomplete(self.step));
        }
        self.step += 1;
        Ok(self.step)
    }

    pub fn prev(&mut self) -> u8 {
        if self.step > FIRST_STEP {
            self.step -= 1;
        }
        self.step
    }

    /// Mark the analysis done. Requires both input steps to be valid.
    pub fn complete(&mut self) -> Result<(), WizardError> {
        for step in [1, 2] {
            if !self.is_step_valid(step) {
                return Err(WizardError::Incomplete(step));
            }
        }
        self.completed = true;
        self.step = LAST_STEP;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Back to step 1 with an empty form.
    pub fn reset(&mut self)
    where
        F: Default,
    {
        *self = Self::new(F::default());
    }
}
