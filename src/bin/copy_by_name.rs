use clap::Parser;
use scanmatch::tools::copy;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "copy-by-name", version, about = "Copy PDFs whose filenames contain listed strings")]
struct Args {
    /// 配置文件路径
    #[arg(long, default_value = "./config.yaml")]
    config: PathBuf,
}

fn main() {
    let args = Args::parse();
    scanmatch::launch(&args.config, copy::DEFAULT_LOG_FILE, copy::run);
}
