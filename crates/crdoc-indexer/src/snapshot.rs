//! Ephemeral git checkouts
//!
//! A [`Snapshot`] is a depth-1 clone in a temporary directory. The directory
//! is removed when the snapshot is dropped, whatever happened in between.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::{IndexError, Result};

/// What to check out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    /// Default branch, with every tag fetched for later enumeration
    DefaultBranch,
    /// A single branch
    Branch(String),
    /// A single tag
    Tag(String),
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitRef::DefaultBranch => write!(f, "default branch"),
            GitRef::Branch(name) => write!(f, "branch {}", name),
            GitRef::Tag(name) => write!(f, "tag {}", name),
        }
    }
}

/// A shallow checkout of one repository
pub struct Snapshot {
    dir: TempDir,
}

impl Snapshot {
    /// Clone `url` at `reference` into a fresh temporary directory
    ///
    /// Tags are fetched by their fully qualified ref, so a branch carrying
    /// the same name is never picked up instead.
    pub fn checkout(url: &str, reference: &GitRef) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("crdoc-").tempdir()?;
        tracing::debug!(url, %reference, dir = %dir.path().display(), "Cloning");

        match reference {
            GitRef::Tag(name) => {
                let full_ref = tag_ref(name);
                let refspec = format!("+{}:{}", full_ref, full_ref);
                git(dir.path(), ["init", "--quiet"])?;
                git(dir.path(), ["remote", "add", "origin", url])?;
                git(
                    dir.path(),
                    [
                        "fetch",
                        "--quiet",
                        "--no-tags",
                        "--depth",
                        "1",
                        "origin",
                        refspec.as_str(),
                    ],
                )?;
                git(dir.path(), ["checkout", "--quiet", "--force", full_ref.as_str()])?;
            }
            GitRef::Branch(name) => {
                clone(dir.path(), url, Some(name.as_str()))?;
            }
            GitRef::DefaultBranch => {
                clone(dir.path(), url, None)?;
                git(
                    dir.path(),
                    [
                        "fetch",
                        "--quiet",
                        "--depth",
                        "1",
                        "origin",
                        "+refs/tags/*:refs/tags/*",
                    ],
                )?;
            }
        }

        Ok(Self { dir })
    }

    /// Root of the working tree
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Committer time of HEAD
    pub fn head_commit_time(&self) -> Result<DateTime<Utc>> {
        let output = git(self.path(), ["log", "-1", "--format=%ct"])?;
        let trimmed = output.trim();
        trimmed
            .parse::<i64>()
            .ok()
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .ok_or_else(|| IndexError::GitOutput {
                command: "log -1 --format=%ct".to_string(),
                output: trimmed.to_string(),
            })
    }

    /// Tag names present in the checkout
    pub fn tags(&self) -> Result<Vec<String>> {
        let output = git(self.path(), ["tag", "--list"])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Force the working tree to `tag`
    pub fn switch_to(&self, tag: &str) -> Result<()> {
        let full_ref = tag_ref(tag);
        git(self.path(), ["checkout", "--quiet", "--force", full_ref.as_str()])?;
        git(self.path(), ["reset", "--quiet", "--hard", full_ref.as_str()])?;
        Ok(())
    }

    /// Files whose relative path matches `path` and whose content matches `content`
    ///
    /// Paths are relative to the root and `/`-separated. The walk is sorted by
    /// file name so the result order is stable; `.git` is never entered.
    /// Unreadable files are logged and skipped.
    pub fn grep(&self, content: &regex::bytes::Regex, path: &Regex) -> Result<Vec<String>> {
        let root = self.path();
        let mut matches = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git");

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !path.is_match(&relative) {
                continue;
            }

            match std::fs::read(entry.path()) {
                Ok(bytes) if content.is_match(&bytes) => matches.push(relative),
                Ok(_) => {}
                Err(e) => tracing::warn!(file = %relative, "Skipping unreadable file: {}", e),
            }
        }

        Ok(matches)
    }
}

fn tag_ref(name: &str) -> String {
    format!("refs/tags/{}", name)
}

/// Depth-1 clone into `dest`, of one branch or of the default branch
fn clone(dest: &Path, url: &str, branch: Option<&str>) -> Result<()> {
    let mut args: Vec<OsString> = vec!["clone".into(), "--quiet".into()];
    args.extend(["--depth".into(), "1".into()]);
    if let Some(branch) = branch {
        args.extend(["--single-branch".into(), "--branch".into(), branch.into()]);
    }
    args.push(url.into());
    args.push(dest.as_os_str().to_owned());
    git(dest, args)?;
    Ok(())
}

/// Run git in `cwd`, returning stdout
fn git<I, S>(cwd: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();

    let output = Command::new("git")
        .args(&args)
        .current_dir(cwd)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(IndexError::GitUnavailable)?;

    if !output.status.success() {
        let command = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(IndexError::Git {
            command,
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_ref_display() {
        assert_eq!(GitRef::Tag("v1".to_string()).to_string(), "tag v1");
        assert_eq!(GitRef::Branch("main".to_string()).to_string(), "branch main");
        assert_eq!(GitRef::DefaultBranch.to_string(), "default branch");
    }

    #[test]
    fn test_missing_repository_is_an_error() {
        let missing = tempfile::tempdir().unwrap();
        let url = format!("file://{}/nope", missing.path().display());

        let result = Snapshot::checkout(&url, &GitRef::Tag("v1".to_string()));
        assert!(matches!(
            result,
            Err(IndexError::Git { .. }) | Err(IndexError::GitUnavailable(_))
        ));
    }
}
