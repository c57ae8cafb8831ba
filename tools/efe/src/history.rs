//! Per-iteration solver logs: tab-separated text files, flushed after each
//! line so a killed run still leaves a usable trace.

use std::fs::File;
use std::io::{self, Write as _};
use std::path::Path;

/// The outer Newton history, `#iter residual alpha`.
pub struct JfnkLog {
    file: File,
}

impl JfnkLog {
    pub fn create(path: &Path) -> io::Result<Self> {
        let mut file = File::create(path)?;
        writeln!(file, "#iter\tresidual\talpha")?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn append(&mut self, iteration: usize, residual: f64, alpha: f64) -> io::Result<()> {
        writeln!(self.file, "{iteration}\t{residual:.16e}\t{alpha:.16e}")?;
        self.file.flush()
    }
}

/// The inner Krylov history, `#jfnk_iter gmres_iter residual`.
pub struct GmresLog {
    file: File,
}

impl GmresLog {
    pub fn create(path: &Path) -> io::Result<Self> {
        let mut file = File::create(path)?;
        writeln!(file, "#jfnk_iter\tgmres_iter\tresidual")?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn append(&mut self, outer: usize, inner: usize, residual: f64) -> io::Result<()> {
        writeln!(self.file, "{outer}\t{inner}\t{residual:.16e}")?;
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_are_readable_mid_run() {
        let dir = std::env::temp_dir();
        let path = dir.join("efe_history_test.txt");

        let mut log = JfnkLog::create(&path).unwrap();
        log.append(0, 5.5, 1.0).unwrap();
        log.append(1, 2.75, 0.5).unwrap();

        // Flushed per line: the file is complete without dropping the log.
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "#iter\tresidual\talpha");
        assert!(lines[1].starts_with("0\t"));
        assert!(lines[2].ends_with("e-1"));

        drop(log);
        std::fs::remove_file(&path).ok();
    }
}
