#![allow(dead_code)]

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn fixture_path(name: &str) -> PathBuf {
    manifest_dir().join("tests").join("fixtures").join(name)
}

pub fn shipped_catalog() -> PathBuf {
    manifest_dir().join("references").join("recommendations.json")
}

pub fn shipped_notes() -> PathBuf {
    manifest_dir().join("references").join("roasts.json")
}

pub fn read_fixture(name: &str) -> Value {
    let raw = fs::read_to_string(fixture_path(name)).expect("read fixture");
    serde_json::from_str(&raw).expect("fixture json")
}

/// Scratch directory whose `references/` starts empty, so runs never pick up
/// the repository catalogs unless a test copies them in.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create workspace");
        fs::create_dir_all(dir.path().join("references")).expect("create references dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn refs_dir(&self) -> PathBuf {
        self.root().join("references")
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, body).expect("write workspace file");
        path
    }

    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        let body = serde_json::to_string_pretty(value).expect("serialize json");
        self.write(name, &body)
    }

    pub fn install_shipped_references(&self) {
        fs::copy(shipped_catalog(), self.refs_dir().join("recommendations.json"))
            .expect("copy catalog");
        fs::copy(shipped_notes(), self.refs_dir().join("roasts.json")).expect("copy notes");
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], envs: &[(&str, &str)]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_perfreview"));
        cmd.args(args)
            .current_dir(self.root())
            .env("PERFREVIEW_REFS_DIR", self.refs_dir())
            .env_remove("PERFREVIEW_RECOMMENDATIONS")
            .env_remove("PERFREVIEW_NOTES")
            .env("PERFREVIEW_LOG", "off");
        for (k, v) in envs {
            cmd.env(k, v);
        }
        cmd.output().expect("run perfreview")
    }
}

pub fn stdout_str(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

pub fn stderr_str(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

pub fn parse_stdout_json(out: &Output) -> Value {
    serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not json ({e}): stdout={} stderr={}",
            stdout_str(out),
            stderr_str(out)
        )
    })
}
