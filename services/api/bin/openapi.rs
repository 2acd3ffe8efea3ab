//! Writes the OpenAPI document of the REST surface to a file.

use clap::Parser;
use flagcall_api::router::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

#[derive(Parser)]
#[command(name = "openapi")]
#[command(version, about = "Export the Flagcall OpenAPI document")]
struct Args {
    /// Where to write the document.
    #[arg(short, long, default_value = "openapi.json")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let doc_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&args.output, doc_json)?;
    println!("Wrote {}", args.output.display());
    Ok(())
}
