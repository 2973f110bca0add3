//! Sample sources and output files.
//!
//! Each fixture pairs a source document with an output file before and
//! after injection.

use std::path::{Path, PathBuf};

/// A source document with an output file before and after injection.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub input: &'static str,
    pub before: &'static str,
    pub after: &'static str,
}

pub const SIMPLE: Scenario = Scenario {
    name: "simple",
    input: r#"{"name": "svi", "owner": "platform"}"#,
    before: "name: #{name}\nowner: #{owner}\n",
    after: "name: svi\nowner: platform\n",
};

pub const COMPLEX: Scenario = Scenario {
    name: "complex",
    input: r#"{"a": 1, "b": {"c": 2, "d": {"e": 3}}}"#,
    before: "a: #{a}\nc: #{b.c}\ne: #{b.d.e}\n",
    after: "a: 1\nc: 2\ne: 3\n",
};

pub const REFERENCE: Scenario = Scenario {
    name: "reference",
    input: r##"{"db": {"host": "db.internal", "port": 5432, "url": "postgres://#{db.host}:#{db.port}/app"}}"##,
    before: "url: #{db.url}\n",
    after: "url: postgres://db.internal:5432/app\n",
};

pub const RECURSIVE: Scenario = Scenario {
    name: "recursive",
    input: r##"{"a": "#{a}", "b": "#{c}", "c": "#{b}"}"##,
    before: "a: #{a}\nb: #{b}\n",
    after: "a: Error: Recursion detected for key `a`!\nb: Error: Recursion detected for key `b`!\n",
};

pub const NUMERIC: Scenario = Scenario {
    name: "numeric",
    input: r#"{"int": 3, "negative": -12, "float": 0.25, "big": 18446744073709551615}"#,
    before: "#{int} #{negative} #{float} #{big}\n",
    after: "3 -12 0.25 18446744073709551615\n",
};

pub const BOOLEAN: Scenario = Scenario {
    name: "boolean",
    input: r#"{"enabled": true, "debug": false, "empty": null}"#,
    before: "enabled: #{enabled}\ndebug: #{debug}\nempty: '#{empty}'\n",
    after: "enabled: true\ndebug: false\nempty: ''\n",
};

pub const CONFLICT: Scenario = Scenario {
    name: "conflict",
    input: r#"{"app": {"name": "first"}, "app.name": "second"}"#,
    before: "name: #{app.name}\n",
    after: "name: second\n",
};

/// Three layered sources each defining `env`; `base` only in the first.
pub const HIERARCHY: [&str; 3] = [
    r#"{"env": "a", "base": "from-a"}"#,
    r#"{"env": "b"}"#,
    r#"{"env": "c"}"#,
];

/// Output template used with [`HIERARCHY`].
pub const HIERARCHY_BEFORE: &str = "env: #{env}\nbase: #{base}\n";

/// Every single-source scenario.
pub const SCENARIOS: [Scenario; 7] = [SIMPLE, COMPLEX, REFERENCE, RECURSIVE, NUMERIC, BOOLEAN, CONFLICT];

/// Write `content` to `dir/relative`, creating parent directories.
pub fn write_file(dir: &Path, relative: &str, content: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture directory");
    }
    std::fs::write(&path, content).expect("write fixture file");
    path
}
