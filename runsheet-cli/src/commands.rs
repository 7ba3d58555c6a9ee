//! Subcommand implementations. Reports go to the given writer.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use reqwest::Client;

use runsheet_core::ingest::{read_grid, write_grid};
use runsheet_core::{DeliveryRun, Grid, RestaurantCatalog, RunsheetService, Template};

use crate::config::Config;

/// Run file plus the optional restaurant catalog it refers to.
#[derive(Debug, Clone)]
pub(crate) struct RunFiles {
    pub(crate) run: PathBuf,
    pub(crate) restaurants: Option<PathBuf>,
}

impl RunFiles {
    fn grid(&self) -> Result<Grid> {
        let file = File::open(&self.run)
            .with_context(|| format!("failed to open run file {}", self.run.display()))?;
        read_grid(file).with_context(|| format!("failed to read {} as CSV", self.run.display()))
    }

    fn catalog(&self) -> Result<Option<RestaurantCatalog>> {
        let Some(path) = &self.restaurants else {
            return Ok(None);
        };
        let file = File::open(path)
            .with_context(|| format!("failed to open restaurant catalog {}", path.display()))?;
        let catalog = RestaurantCatalog::from_reader(file)
            .with_context(|| format!("invalid restaurant catalog {}", path.display()))?;
        tracing::debug!(restaurants = catalog.len(), "catalog loaded");
        Ok(Some(catalog))
    }

    fn parse(&self) -> Result<DeliveryRun> {
        let grid = self.grid()?;
        let catalog = self.catalog()?;
        runsheet_core::parse(&grid, catalog.as_ref())
            .with_context(|| format!("{} is not a valid run", self.run.display()))
    }
}

/// Where the template comes from, in order of precedence.
#[derive(Debug, Clone, Default)]
pub(crate) struct TemplateChoice {
    pub(crate) path: Option<PathBuf>,
    pub(crate) format: Option<String>,
}

impl TemplateChoice {
    /// Explicit file, else named format, else the run's own `MessageFormat`.
    fn resolve(&self, config: &Config, run: &DeliveryRun) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let name = self
            .format
            .as_deref()
            .or(run.control.message_format.as_deref());
        match name {
            Some(name) => Ok(config.format(name)?.to_path_buf()),
            None => bail!("no template given: pass --template or --format, or set MessageFormat in the run"),
        }
    }
}

fn load_template(path: &Path) -> Result<Template> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read template {}", path.display()))?;
    Template::parse(&source).with_context(|| format!("invalid template {}", path.display()))
}

/// Validate a run and list its warnings.
pub(crate) fn check(out: &mut impl Write, files: &RunFiles) -> Result<()> {
    let run = files.parse()?;
    writeln!(
        out,
        "{}: version {}, {} driver(s), {} restaurant(s)",
        files.run.display(),
        run.version(),
        run.drivers.len(),
        run.restaurants.len()
    )?;
    for warning in &run.warnings {
        writeln!(out, "warning: {warning}")?;
    }
    Ok(())
}

/// Render a message template over a run, once or once per driver.
pub(crate) fn render(
    out: &mut impl Write,
    config: &Config,
    files: &RunFiles,
    choice: &TemplateChoice,
    per_driver: bool,
) -> Result<()> {
    let run = files.parse()?;
    let path = choice.resolve(config, &run)?;
    let template = load_template(&path)?;
    tracing::info!(template = %path.display(), per_driver, "rendering");

    if per_driver {
        let messages = template
            .render_drivers(&run)
            .with_context(|| format!("failed to render {}", path.display()))?;
        for message in messages {
            writeln!(out, "== @{} ==", message.username)?;
            write!(out, "{}", message.text)?;
            if !message.text.ends_with('\n') {
                writeln!(out)?;
            }
        }
    } else {
        let text = template
            .render_run(&run)
            .with_context(|| format!("failed to render {}", path.display()))?;
        write!(out, "{text}")?;
    }
    Ok(())
}

/// Order every driver's deliveries and write the rewritten run.
///
/// The rewritten CSV goes to `output` when given, else to `out`; the route
/// summary goes to `out` only in the former case.
pub(crate) async fn sequence(
    out: &mut impl Write,
    config: &Config,
    files: &RunFiles,
    output: Option<&Path>,
) -> Result<()> {
    let grid = files.grid()?;
    let catalog = files.catalog()?;
    let client = Client::builder()
        .user_agent(config.provider.user_agent.as_str())
        .build()?;
    let service = RunsheetService::new(runsheet_provider_osm::port(client, config.provider.osm()));

    let resequenced = service
        .resequence(&grid, catalog.as_ref())
        .await
        .with_context(|| format!("failed to sequence {}", files.run.display()))?;

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_grid(file, &resequenced.grid)?;
            for route in &resequenced.routes {
                writeln!(
                    out,
                    "@{}: {} stop(s), {} min, {} geocode / {} route call(s)",
                    route.username,
                    route.order.len(),
                    route.total_travel_seconds.div_ceil(60),
                    route.calls.geocode,
                    route.calls.travel_time
                )?;
            }
            writeln!(out, "wrote {}", path.display())?;
        }
        None => write_grid(&mut *out, &resequenced.grid)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../runsheet-core/tests/fixtures")
            .join(name)
    }

    fn gen2() -> RunFiles {
        RunFiles {
            run: fixture("run-gen2.csv"),
            restaurants: Some(fixture("restaurants.csv")),
        }
    }

    fn output(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).expect("utf-8 output")
    }

    #[test]
    fn check_reports_summary_and_warnings() {
        let mut buffer = Vec::new();
        check(&mut buffer, &gen2()).expect("valid run");
        let text = output(buffer);
        assert!(text.contains("version 2-0-0, 2 driver(s), 3 restaurant(s)"), "{text}");
        assert!(
            text.contains("warning: bob: reaches 'Cafe Raj' at 5:15 PM, after its start time 5:05 PM"),
            "{text}"
        );
    }

    #[test]
    fn check_fails_without_the_catalog_entry() {
        let files = RunFiles {
            run: fixture("run-gen3.csv"),
            restaurants: Some(fixture("missing.csv")),
        };
        let err = check(&mut Vec::new(), &files).expect_err("catalog missing");
        assert!(err.to_string().starts_with("failed to open restaurant catalog"), "{err}");
    }

    #[test]
    fn render_uses_the_runs_message_format() {
        let dir = TempDir::new().expect("temp dir");
        let template = dir.path().join("weekly.txt");
        fs::write(&template, r#"LOOP &{Driver} { "@" ${Driver.UserName} " " ${Driver.TotalStdMeals} "\n" }"#)
            .expect("template written");
        let mut config = Config::default();
        config.formats.insert("weekly".to_owned(), template);

        let files = RunFiles {
            run: fixture("run-gen3.csv"),
            restaurants: Some(fixture("restaurants.csv")),
        };
        let mut buffer = Vec::new();
        render(&mut buffer, &config, &files, &TemplateChoice::default(), false).expect("rendered");
        assert_eq!(output(buffer), "@dana 3\n");
    }

    #[test]
    fn render_per_driver_adds_headings() {
        let dir = TempDir::new().expect("temp dir");
        let template = dir.path().join("driver.txt");
        fs::write(&template, "${Driver.Name}").expect("template written");
        let choice = TemplateChoice {
            path: Some(template),
            format: None,
        };

        let mut buffer = Vec::new();
        render(&mut buffer, &Config::default(), &gen2(), &choice, true).expect("rendered");
        assert_eq!(output(buffer), "== @anne ==\nAnne Driver\n== @bob ==\nBob Driver\n");
    }

    #[test]
    fn render_without_any_template_source_fails() {
        let err = render(&mut Vec::new(), &Config::default(), &gen2(), &TemplateChoice::default(), false)
            .expect_err("gen2 run has no MessageFormat");
        assert!(err.to_string().starts_with("no template given"), "{err}");
    }
}
