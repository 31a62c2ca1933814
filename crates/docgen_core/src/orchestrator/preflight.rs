//! Checks that run before the first record is touched.
//!
//! Everything here reports all problems of one kind together, so a user can
//! fix a configuration in one pass.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::records::RecordSet;

/// Every input file the batch reads, resolved against `base_dir`.
///
/// Each path appears once, at its first use.
pub fn required_inputs(settings: &Settings, base_dir: &Path) -> Vec<PathBuf> {
    let mut inputs = vec![Settings::resolve(base_dir, &settings.files.data_file)];
    for job in &settings.jobs {
        inputs.push(Settings::resolve(base_dir, &job.template));
        if let Some(email) = &job.email {
            inputs.push(Settings::resolve(base_dir, &email.body_template));
        }
    }
    let mut seen = HashSet::new();
    inputs.retain(|path| seen.insert(path.clone()));
    inputs
}

/// Required inputs that do not exist.
pub fn missing_inputs(settings: &Settings, base_dir: &Path) -> Vec<PathBuf> {
    required_inputs(settings, base_dir)
        .into_iter()
        .filter(|p| !p.exists())
        .collect()
}

/// `<job>: <column>` for every referenced column absent from the header.
pub fn missing_columns(settings: &Settings, records: &RecordSet) -> Vec<String> {
    settings
        .jobs
        .iter()
        .flat_map(|job| {
            records
                .missing_columns(&job.header_columns())
                .into_iter()
                .map(move |column| format!("{}: {}", job.name, column))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldBinding, JobEmailSettings, JobSettings};
    use crate::records::Record;
    use crate::substitute::SubstitutionMode;
    use std::collections::BTreeMap;
    use std::fs;

    fn job(name: &str, template: &str) -> JobSettings {
        JobSettings {
            name: name.to_string(),
            template: template.to_string(),
            output_subdir: None,
            file_prefix: None,
            name_column: "ФИО участника".to_string(),
            indexed: true,
            mode: SubstitutionMode::Segments,
            combined_name: None,
            fields: vec![FieldBinding::new("ФИО_участника", "ФИО участника")],
            filter: None,
            email: None,
        }
    }

    #[test]
    fn reports_every_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("certificate.docx"), b"x").unwrap();

        let mut invitations = job("invitations", "invitation.docx");
        invitations.email = Some(JobEmailSettings {
            recipient_column: "e-mail".to_string(),
            subject: String::new(),
            body_template: "email.html".to_string(),
            body_fields: BTreeMap::new(),
            attachment_prefix: None,
        });
        let settings = Settings {
            jobs: vec![job("certificates", "certificate.docx"), invitations],
            files: crate::config::FileSettings {
                data_file: "data.csv".to_string(),
            },
            ..Default::default()
        };

        let missing = missing_inputs(&settings, dir.path());
        assert_eq!(
            missing,
            vec![
                dir.path().join("data.csv"),
                dir.path().join("invitation.docx"),
                dir.path().join("email.html"),
            ]
        );
    }

    #[test]
    fn shared_template_is_listed_once() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            jobs: vec![
                job("certificates", "shared.docx"),
                job("diplomas", "diploma.docx"),
                job("letters", "shared.docx"),
            ],
            files: crate::config::FileSettings {
                data_file: "data.csv".to_string(),
            },
            ..Default::default()
        };

        assert_eq!(
            missing_inputs(&settings, dir.path()),
            vec![
                dir.path().join("data.csv"),
                dir.path().join("shared.docx"),
                dir.path().join("diploma.docx"),
            ]
        );
    }

    #[test]
    fn reports_missing_columns_per_job() {
        let settings = Settings {
            jobs: vec![job("certificates", "c.docx")],
            ..Default::default()
        };
        let records = RecordSet {
            columns: vec!["Название доклада".to_string()],
            records: vec![Record::new(0, vec![])],
        };
        assert_eq!(
            missing_columns(&settings, &records),
            vec!["certificates: ФИО участника"]
        );
    }
}
