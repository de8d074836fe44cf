use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("joblens")
        .version("1.0.0")
        .about("Extract structured job records from job-posting pages")
        .arg(clap::arg!(<URL> "URL of the job posting"))
        .arg(
            clap::arg!(--strategy <STRATEGY> "Acquisition strategy")
                .default_value("direct")
                .value_parser(["direct", "browser"]),
        )
        .arg(clap::arg!(--render "Render the page in headless Chromium"))
        .arg(clap::arg!(--insecure "Skip TLS certificate verification"))
        .arg(clap::arg!(--timeout <SECS> "Fetch and page-load timeout in seconds").default_value("30"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests and the browser").value_name("UA"))
        .arg(
            clap::arg!(--chrome <PATH> "Chromium executable for the browser strategy")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--pandoc "Try pandoc before the built-in converters"))
        .arg(clap::arg!(--model <MODEL> "Model name").default_value("gpt-4o-mini"))
        .arg(clap::arg!(--temperature <TEMP> "Sampling temperature").default_value("0.1"))
        .arg(clap::arg!(--api_key <KEY> "Model provider API key"))
        .arg(clap::arg!(--base_url <URL> "Model provider base URL"))
        .arg(clap::arg!(--normalize_only "Stop after normalization and print the text the model would receive"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--compact "Print compact JSON instead of pretty JSON"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "joblens", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "joblens", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "joblens", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "joblens", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
