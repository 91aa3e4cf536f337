//! Scaffold a new rules project: a starter rule document, a system
//! config, and a sensor catalog stub.

use std::path::{Path, PathBuf};

use anyhow::Context;

const STARTER_RULES: &str = r#"rules:
  - name: HighTemperature
    description: Alert when the temperature rises above 30 degrees.
    conditions:
      all:
        - condition:
            type: comparison
            sensor: input:temperature
            operator: ">"
            value: 30
    actions:
      - set_value:
          key: output:high_temperature
          value: true
    else:
      actions:
        - set_value:
            key: output:high_temperature
            value: false
"#;

const STARTER_CONFIG: &str = r#"version: 1
cycleTime: 100
bufferCapacity: 100
logLevel: info
redis:
  endpoints:
    - localhost:6379
"#;

const STARTER_CATALOG: &str = r#"sensors:
  - id: input:temperature
    type: number
    unit: celsius
"#;

pub(crate) fn run(path: PathBuf) -> anyhow::Result<()> {
    let rules_dir = path.join("rules");
    std::fs::create_dir_all(&rules_dir)
        .with_context(|| format!("creating {}", rules_dir.display()))?;

    write_new(&rules_dir.join("example.yaml"), STARTER_RULES)?;
    write_new(&path.join("pulsar.yaml"), STARTER_CONFIG)?;
    write_new(&path.join("sensors.yaml"), STARTER_CATALOG)?;

    println!("initialized rules project in {}", path.display());
    println!("  rules/example.yaml  starter rule document");
    println!("  pulsar.yaml         system configuration");
    println!("  sensors.yaml        sensor catalog");
    println!();
    println!("next: pulsar compile --rules rules --config pulsar.yaml --output beacon-out");
    Ok(())
}

fn write_new(path: &Path, contents: &str) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("refusing to overwrite existing {}", path.display());
    }
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}
