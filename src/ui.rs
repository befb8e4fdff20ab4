//! Interface de terminal — spinner e saída colorida para `autoapply run`.
//!
//! Usa as crates `indicatif` para o progresso e `console` para estilização
//! com cores. O [`RunProgress`] acompanha visualmente uma execução do fluxo
//! de candidaturas implementando [`RunReporter`].

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::applicant::ApplyOutcome;
use crate::hh::Vacancy;
use crate::orchestrator::{RunReporter, RunTally};
use crate::store::ApplicationRecord;

/// Indicador visual de progresso de uma execução no terminal.
///
/// Exibe um spinner enquanto as vagas são buscadas, depois uma barra com
/// uma linha colorida por vaga: aplicada (verde), falha (vermelho) ou
/// já aplicada (amarelo).
pub struct RunProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl RunProgress {
    /// Inicia o spinner da busca e retorna a instância de progresso.
    pub fn start(query: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("Searching HH for \"{query}\""));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finaliza o spinner e exibe o resumo da execução.
    pub fn complete(&self, tally: &RunTally) {
        self.pb.finish_and_clear();
        println!();
        println!(
            "  {} Applied: {}",
            self.green.apply_to("✓"),
            tally.applied_count
        );
        println!("  {} Failed:  {}", self.red.apply_to("✗"), tally.failed_count);
        println!(
            "  {} Skipped: {}",
            self.yellow.apply_to("↷"),
            tally.skipped_count
        );
        let elapsed = tally.finished_at - tally.started_at;
        println!(
            "  {}",
            Style::new().dim().apply_to(format!(
                "run {} finished in {}s",
                tally.run_id,
                elapsed.num_seconds()
            ))
        );
        if tally.auth_failed {
            println!(
                "  {} HH credentials were rejected; run `autoapply refresh` or `autoapply authorize`",
                self.red.apply_to("!")
            );
        }
    }

    /// Encerra o spinner sem resumo (execução abortada).
    pub fn abandon(&self) {
        self.pb.finish_and_clear();
    }
}

impl RunReporter for RunProgress {
    fn fetched(&self, count: usize) {
        self.pb.set_length(count as u64);
        self.pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .expect("invalid template"),
        );
        self.pb.set_message(format!("{count} vacancies found"));
    }

    fn finished_item(&self, vacancy: &Vacancy, outcome: &ApplyOutcome) {
        let (mark, style) = if outcome.is_applied() {
            ("✓", &self.green)
        } else if *outcome == ApplyOutcome::AlreadyApplied {
            ("↷", &self.yellow)
        } else {
            ("✗", &self.red)
        };
        let title = vacancy.name.as_deref().unwrap_or("");
        self.pb.println(format!(
            "  {} {} {title} — {outcome}",
            style.apply_to(mark),
            vacancy.id
        ));
        self.pb.inc(1);
    }
}

/// Imprime o estado do banco de candidaturas (`autoapply status`).
pub fn print_status(total: i64, recent: &[ApplicationRecord]) {
    let bold = Style::new().bold();
    println!("{} {total}", bold.apply_to("Applications on record:"));
    for record in recent {
        if record.company_id.is_empty() {
            println!("  #{:<5} vacancy {} ({})", record.id, record.vacancy_id, record.status);
        } else {
            println!(
                "  #{:<5} vacancy {} at {} ({})",
                record.id, record.vacancy_id, record.company_id, record.status
            );
        }
    }
}
