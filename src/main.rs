// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use Commands::List;
use Commands::Run;
use anyhow::Result;
use clap::Parser;
use sweeplab::benchmark::run_benchmarks;
use sweeplab::cli::Cli;
use sweeplab::cli::Commands;
use sweeplab::config::Config;
use sweeplab::logging::setup_tracing;

#[tokio::main]
async fn main() -> Result<()> {
  let _guard = setup_tracing()?;

  let Cli { command } = Cli::parse();
  let main_span = tracing::info_span!("sweep");
  let _enter = main_span.enter();

  match command {
    Run(run_args) => {
      tracing::info!("Initializing Benchmark Run...");

      let config = Config::try_from(run_args)?;
      let summary = run_benchmarks(config).await?;
      print!("{summary}");

      if !summary.all_passed() {
        anyhow::bail!(
          "{} failed, {} timed out, {} skipped",
          summary.failed,
          summary.timed_out,
          summary.skipped.len()
        );
      }
    }
    List(run_args) => {
      let mut config = Config::try_from(run_args)?;
      config.dry_run = true;
      let summary = run_benchmarks(config).await?;

      for skipped in &summary.skipped {
        match &skipped.name {
          Some(name) => println!("SKIPPED {name}: {}", skipped.reason),
          None => println!("SKIPPED {}", skipped.reason),
        }
      }
      if !summary.skipped.is_empty() {
        anyhow::bail!("{} benchmark(s) cannot be run", summary.skipped.len());
      }
    }
  }

  Ok(())
}
