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

//! # Sweeplab
//!
//! `sweeplab` runs parameterized benchmark sweeps. A YAML spec declares a
//! command template, the parameter values to sweep, and regexes that pull
//! metrics out of the command's output. Each benchmark expands into
//! variants that run as child processes, and every outcome lands in one
//! CSV table with a JSON twin.
//!
//! The library backs the `sweep` CLI, but its modules also work on their own.
//!
//! ## Core Modules
//!
//! * [`spec`]: Finds spec documents (paths or globs), resolves shared blocks
//!   and `extends` chains, and validates each benchmark.
//! * [`variant`]: Parameter sets and their expansion into named variants.
//! * [`command`]: The `{placeholder}` command template.
//! * [`executor`]: Runs one command with an environment overlay, working
//!   directory and timeout. Output is captured even when the command is killed.
//! * [`metrics`]: Regex extraction and reductions (`mean`, `final`, `min`, `value`).
//! * [`results`]: Collects result rows and writes the CSV and JSON files.
//! * [`benchmark`]: The `run_benchmarks` function that drives a whole run.
//! * [`config`]: Layers CLI args, `SWEEP_*` variables and `sweep.toml` into a `Config`.
//! * [`cli`]: Defines the `clap`-based command-line interface.
//! * [`error`]: Defines the custom error types for the library.
//! * [`logging`]: Provides the `setup_tracing` utility.

pub mod benchmark;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod results;
pub mod spec;
pub mod variant;
