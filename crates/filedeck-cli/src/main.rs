// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod dump;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::{API_BASE_ENV, Config};
use filedeck_api::{FilesApi, QueryClient};
use filedeck_app::TableView;
use runtime::ApiRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `filedeck --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    let _log_guard = logging::init(&config)?;
    let api = build_api(&config.api_base_url()?, &config)?;
    info!(base_url = api.base_url(), "filedeck starting");

    if options.check_only {
        let names = api
            .files_list()
            .with_context(|| format!("reach file API at {}", api.base_url()))?;
        println!("ok: {} reachable, {} files", api.base_url(), names.len());
        return Ok(());
    }

    if options.list_files {
        for name in api.files_list()? {
            println!("{name}");
        }
        return Ok(());
    }

    if options.dump {
        let view = dump::load_view(&api, options.search.as_deref());
        if let Some(notice) = view.search_error() {
            eprintln!("{notice}");
        }
        print!("{}", dump::render_dump(&view)?);
        return Ok(());
    }

    let mut view = initial_view(options.search);
    let mut runtime = ApiRuntime::new(api);
    filedeck_tui::run_app(&mut view, &mut runtime)
}

fn initial_view(search: Option<String>) -> TableView {
    TableView::with_input(search.unwrap_or_default())
}

fn build_api(base_url: &str, config: &Config) -> Result<FilesApi> {
    let client = QueryClient::with_defaults(config.api_timeout()?, config.query_defaults()?)?;
    FilesApi::new(base_url, client).with_context(|| {
        format!("invalid API base URL {base_url:?}; fix [api].base_url or {API_BASE_ENV}")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    list_files: bool,
    dump: bool,
    search: Option<String>,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        list_files: false,
        dump: false,
        search: None,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--search" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--search requires a file name"))?;
                options.search = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--list-files" => {
                options.list_files = true;
            }
            "--dump" => {
                options.dump = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("filedeck");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and reach the file API");
    println!("  --list-files             Print the names of all ingested files");
    println!("  --dump                   Print the file table and exit");
    println!("  --search <name>          Start with a file name search committed");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, build_api, initial_view, parse_cli_args};
    use crate::config::Config;
    use anyhow::Result;
    use filedeck_testkit::{MockBackend, MockResponse};
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/filedeck-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_example: false,
                check_only: false,
                list_files: false,
                dump: false,
                search: None,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--dump", "--search"], default_options_path())
            .expect_err("missing search value should fail");
        assert!(error.to_string().contains("--search requires a file name"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.list_files);
        assert!(!options.dump);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_dump_with_search() -> Result<()> {
        let options = parse_cli_args(
            vec!["--dump", "--search", "test file (1).txt"],
            default_options_path(),
        )?;
        assert!(options.dump);
        assert_eq!(options.search.as_deref(), Some("test file (1).txt"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn build_api_applies_config_to_client() -> Result<()> {
        let backend = MockBackend::start()?;
        backend.route("/files/list", MockResponse::json(json!(["a.txt", "b.csv"])));

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "version = 1\n\n[api]\ntimeout = \"2s\"\n\n[query]\nstale_time = \"1m\"\nretry = 0\n",
        )?;
        let config = Config::load(&path)?;

        let api = build_api(&format!("{}/", backend.base_url()), &config)?;
        assert_eq!(api.base_url(), backend.base_url());
        assert_eq!(api.client().defaults().retry, 0);
        assert_eq!(api.files_list()?, vec!["a.txt".to_owned(), "b.csv".to_owned()]);
        api.files_list()?;
        assert_eq!(backend.hits("/files/list"), 1);
        Ok(())
    }

    #[test]
    fn build_api_rejects_bad_base_url() {
        let error = build_api("ftp://files.example", &Config::default())
            .expect_err("non-http base URL should fail");
        assert!(error.to_string().contains("invalid API base URL"));
    }

    #[test]
    fn initial_view_prefills_search_without_committing() -> Result<()> {
        let options = parse_cli_args(vec!["--search", "test.txt"], default_options_path())?;
        let view = initial_view(options.search);
        assert_eq!(view.input_value, "test.txt");
        assert!(view.search_name.is_empty());
        assert_eq!(view.search_request(), 0);

        let view = initial_view(None);
        assert!(view.input_value.is_empty());
        Ok(())
    }
}
