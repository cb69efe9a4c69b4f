use forge3d_style::cli::run_style_eval_cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    run_style_eval_cli()
}
