//! Per-locale fan-out.

use rayon::prelude::*;

use crate::locale::Locale;

/// Outcomes of running one task per locale.
///
/// Both lists keep the order of the locales passed in.
#[derive(Debug)]
pub struct LocaleReport<T, E> {
    /// Locales whose task completed
    pub succeeded: Vec<(Locale, T)>,

    /// Locales whose task failed, with the error
    pub failed: Vec<(Locale, E)>,
}

impl<T, E> LocaleReport<T, E> {
    /// True when no locale failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of locales attempted.
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, E> Default for LocaleReport<T, E> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Run `task` once per locale in parallel and collect every outcome.
///
/// A failing locale never prevents the others from running.
pub fn for_each_locale<T, E, F>(locales: &[Locale], task: F) -> LocaleReport<T, E>
where
    F: Fn(&Locale) -> Result<T, E> + Sync,
    T: Send,
    E: Send,
{
    let outcomes: Vec<(Locale, Result<T, E>)> = locales
        .par_iter()
        .map(|locale| (locale.clone(), task(locale)))
        .collect();

    let mut report = LocaleReport::default();
    for (locale, outcome) in outcomes {
        match outcome {
            Ok(value) => report.succeeded.push((locale, value)),
            Err(err) => report.failed.push((locale, err)),
        }
    }

    report
}
