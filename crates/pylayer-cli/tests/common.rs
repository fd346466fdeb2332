#![allow(dead_code)]

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use assert_cmd::{assert::Assert, cargo::cargo_bin_cmd, Command};
use serde_json::Value;
use tempfile::TempDir;

/// Stands in for pip: `install <name> --target <dir>` creates `<dir>/<name>/__init__.py`,
/// `install -r <file> --target <dir>` does the same for every line of the file, and
/// names starting with `nonexistent-` fail the way pip does for unknown packages.
const FAKE_PIP: &str = r#"#!/bin/sh
[ "$1" = "install" ] || exit 64
shift
install_one() {
    mkdir -p "$2/$1" || exit 1
    printf '# %s\n' "$1" > "$2/$1/__init__.py" || exit 1
    echo "Successfully installed $1"
}
if [ "$1" = "-r" ]; then
    while IFS= read -r name || [ -n "$name" ]; do
        [ -z "$name" ] && continue
        install_one "$name" "$4"
    done < "$2"
    exit 0
fi
case "$1" in
    nonexistent-*)
        echo "ERROR: No matching distribution found for $1" >&2
        exit 1
        ;;
esac
install_one "$1" "$3"
"#;

pub struct Sandbox {
    pub temp: TempDir,
}

impl Sandbox {
    pub fn new(prefix: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .expect("tempdir");
        fs::write(temp.path().join("fake_pip.sh"), FAKE_PIP).expect("write fake pip");
        Self { temp }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn out_dir(&self) -> PathBuf {
        self.path().join("out")
    }

    /// A `pylayer` command wired to the fake pip with no AWS credentials in scope.
    pub fn command(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("pylayer");
        cmd.current_dir(self.path())
            .env(
                "PYLAYER_PIP",
                format!("/bin/sh {}", self.path().join("fake_pip.sh").display()),
            )
            .env("NO_COLOR", "1")
            .env(
                "AWS_SHARED_CREDENTIALS_FILE",
                self.path().join("no-credentials"),
            )
            .env("AWS_CONFIG_FILE", self.path().join("no-config"))
            .env("AWS_EC2_METADATA_DISABLED", "true")
            .env_remove("AWS_ACCESS_KEY_ID")
            .env_remove("AWS_SECRET_ACCESS_KEY")
            .env_remove("AWS_SESSION_TOKEN")
            .env_remove("AWS_PROFILE")
            .env_remove("AWS_WEB_IDENTITY_TOKEN_FILE")
            .env_remove("AWS_ROLE_ARN")
            .env_remove("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI")
            .env_remove("AWS_CONTAINER_CREDENTIALS_FULL_URI")
            .env_remove("PYLAYER_LAMBDA_ENDPOINT");
        cmd
    }
}

pub fn parse_json(assert: &Assert) -> Value {
    let stdout = &assert.get_output().stdout;
    serde_json::from_slice(stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {}",
            String::from_utf8_lossy(stdout)
        )
    })
}

pub fn stdout_text(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).to_string()
}

pub fn stderr_text(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).to_string()
}

pub fn archive_names(path: &Path) -> Vec<String> {
    let file = File::open(path).expect("open archive");
    let archive = zip::ZipArchive::new(file).expect("valid zip");
    let mut names: Vec<String> = archive.file_names().map(ToString::to_string).collect();
    names.sort();
    names
}
