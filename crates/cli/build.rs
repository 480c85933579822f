use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("stash")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Stash Contributors")
        .about("Fetch a web page and print its article record")
        .arg(clap::arg!(<URL> "URL of the page to save"))
        .arg(
            clap::arg!(--html <FILE> "Read HTML from a local file, or '-' for stdin, instead of fetching")
                .value_name("FILE"),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (json, text)")
                .value_name("FORMAT")
                .default_value("json")
                .value_parser(["json", "text"]),
        )
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(
            clap::arg!(--"words-per-minute" <NUM> "Reading speed used for the reading time estimate")
                .default_value("200"),
        )
        .arg(clap::arg!(--"excerpt-length" <NUM> "Maximum excerpt length in characters").default_value("300"))
        .arg(clap::arg!(--"no-tables" "Leave tables out of the article text"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "stash", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "stash", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "stash", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "stash", &completions_dir).unwrap();
}
