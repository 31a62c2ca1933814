//! LibreOffice headless converter.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{ConversionOutput, ConvertError, ConvertResult, DocumentConverter};

/// Runs `soffice --headless --convert-to pdf --outdir <dir> <source>`.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: PathBuf,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new("soffice")
    }
}

impl SofficeConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl DocumentConverter for SofficeConverter {
    fn name(&self) -> &str {
        "soffice"
    }

    fn convert(&self, source: &Path, target: &Path) -> ConvertResult<ConversionOutput> {
        if !source.exists() {
            return Err(ConvertError::SourceNotFound(source.to_path_buf()));
        }

        let out_dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut cmd = Command::new(&self.program);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(&out_dir)
            .arg(source);

        let command = format!(
            "{} --headless --convert-to pdf --outdir {} {}",
            self.program.display(),
            out_dir.display(),
            source.display()
        );
        tracing::debug!("Running: {}", command);

        let output = cmd.output().map_err(|e| ConvertError::Spawn {
            program: self.program.display().to_string(),
            source: e,
        })?;

        let mut lines: Vec<(String, bool)> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|l| (l.to_string(), false))
            .collect();
        lines.extend(
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(|l| (l.to_string(), true)),
        );

        if !output.status.success() {
            return Err(ConvertError::CommandFailed {
                tool: self.name().to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stem = source
            .file_stem()
            .ok_or_else(|| ConvertError::SourceNotFound(source.to_path_buf()))?;
        // Stems like `Name_И.И._1` contain dots, so no `with_extension`.
        let produced = out_dir.join(format!("{}.pdf", stem.to_string_lossy()));
        if !produced.exists() {
            return Err(ConvertError::MissingOutput(produced));
        }
        if produced != target {
            fs::rename(&produced, target)?;
        }

        tracing::info!("Converted {} to {}", source.display(), target.display());
        Ok(ConversionOutput { command, lines })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    /// A stand-in converter script accepting the same arguments.
    fn fake_program(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-soffice");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    const WORKING: &str = r#"outdir="$5"; src="$6"; name=$(basename "$src" .docx)
echo "convert $src"
printf '%%PDF-1.4\n' > "$outdir/$name.pdf""#;

    #[test]
    fn converts_and_moves_to_target() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Certificate_A_1.docx");
        fs::write(&source, b"docx").unwrap();
        let converter = SofficeConverter::new(fake_program(dir.path(), WORKING));

        let target = dir.path().join("renamed.pdf");
        let output = converter.convert(&source, &target).unwrap();

        assert!(target.exists());
        assert!(!dir.path().join("Certificate_A_1.pdf").exists());
        assert!(output.command.contains("--convert-to pdf"));
        assert_eq!(output.lines.len(), 1);
    }

    #[test]
    fn failing_command_reports_stderr() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.docx");
        fs::write(&source, b"docx").unwrap();
        let converter = SofficeConverter::new(fake_program(dir.path(), "echo boom >&2; exit 3"));

        match converter.convert(&source, &dir.path().join("a.pdf")) {
            Err(ConvertError::CommandFailed {
                exit_code, message, ..
            }) => {
                assert_eq!(exit_code, 3);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn silent_success_without_output_is_an_error() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.docx");
        fs::write(&source, b"docx").unwrap();
        let converter = SofficeConverter::new(fake_program(dir.path(), "exit 0"));

        assert!(matches!(
            converter.convert(&source, &dir.path().join("a.pdf")),
            Err(ConvertError::MissingOutput(_))
        ));
    }

    #[test]
    fn missing_source_and_program() {
        let dir = tempdir().unwrap();
        let converter = SofficeConverter::new(dir.path().join("no-such-program"));
        assert!(matches!(
            converter.convert(&dir.path().join("x.docx"), &dir.path().join("x.pdf")),
            Err(ConvertError::SourceNotFound(_))
        ));

        let source = dir.path().join("x.docx");
        fs::write(&source, b"docx").unwrap();
        assert!(matches!(
            converter.convert(&source, &dir.path().join("x.pdf")),
            Err(ConvertError::Spawn { .. })
        ));
    }
}
