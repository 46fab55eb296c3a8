//! Running a whole knowledge base through a solver.

use std::io::{BufRead, BufWriter, ErrorKind, Write};
use std::process::ChildStdin;
use std::time::{Duration, Instant};

use crate::config::SolverConfig;
use crate::knowledge_base::KnowledgeBase;

use super::process::SolverProcess;
use super::transform::StatementTransformer;
use super::{SolverKind, SolverResult};

/// Outcome of one solver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverRun {
    /// Every line the solver printed on stdout.
    pub output: Vec<String>,
    pub elapsed: Duration,
    /// The solver was stopped because it exceeded its timeout.
    pub timed_out: bool,
}

/// The program a solver of `kind` would receive, one statement per line.
pub fn render_program(kind: SolverKind, kb: &KnowledgeBase) -> String {
    let transformer = kind.transformer();
    let mut program = String::new();
    for (index, statement) in kb.statements().iter().enumerate() {
        program.push_str(&transformer.transform(statement, index));
        program.push('\n');
    }
    program
}

/// Stream `kb` into a fresh solver process and collect its output.
///
/// Statements that cannot be written are logged and skipped. A solver that
/// outlives its timeout is terminated and whatever it printed is returned.
pub fn run_solver(
    kind: SolverKind,
    config: &SolverConfig,
    kb: &KnowledgeBase,
) -> SolverResult<SolverRun> {
    let started = Instant::now();
    let transformer = kind.transformer();

    let mut process = SolverProcess::new(config.clone());
    process.exec()?;
    let writer = process.take_writer()?;
    let reader = process.take_reader()?;

    // The timeout covers streaming too: a solver that stops reading is
    // killed, which fails the blocked write.
    let (status, output) = std::thread::scope(|scope| {
        let collector = scope.spawn(move || {
            reader
                .lines()
                .map_while(Result::ok)
                .collect::<Vec<String>>()
        });
        let feeder = scope.spawn(move || stream_program(writer, transformer, kb));

        let status = process.solve();
        if !matches!(status, Ok(Some(_))) {
            process.close();
        }
        let _ = feeder.join();
        let output = collector.join().unwrap_or_default();
        (status, output)
    });
    let timed_out = status?.is_none();
    process.close();

    let elapsed = started.elapsed();
    tracing::info!(
        solver = %kind,
        elapsed_ms = elapsed.as_millis() as u64,
        lines = output.len(),
        timed_out,
        "solver finished"
    );
    Ok(SolverRun {
        output,
        elapsed,
        timed_out,
    })
}

/// Write one line per statement, then close the solver input.
fn stream_program(
    mut writer: BufWriter<ChildStdin>,
    transformer: &dyn StatementTransformer,
    kb: &KnowledgeBase,
) {
    for (index, statement) in kb.statements().iter().enumerate() {
        let line = transformer.transform(statement, index);
        match writeln!(writer, "{line}") {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                tracing::warn!(
                    error = %e,
                    index,
                    skipped = kb.len() - index,
                    "solver closed its input, skipping remaining statements"
                );
                return;
            }
            Err(e) => tracing::warn!(
                error = %e,
                index,
                %statement,
                "failed to write statement to solver, skipping"
            ),
        }
    }
    if let Err(e) = writer.flush() {
        tracing::warn!(error = %e, "failed to flush solver input");
    }
}
