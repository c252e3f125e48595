//! Terminal report rendering
//!
//! Produces the sectioned human report (system info, process info,
//! calculation, recommended config, warnings) and, under
//! `--config-only`, just the bare config block for piping into a file.
//! All writes go through a generic writer so tests can capture output.

use std::io::Write;

use console::Style;

use crate::calculator::{PreforkConfig, WorkerServerConfig};
use crate::config::PoolType;
use crate::php::ProcessMetrics;
use crate::system::SystemMetrics;

const RULE_WIDTH: usize = 40;

/// Formats and writes the report sections.
pub struct Printer<W: Write> {
    w: W,
    no_color: bool,
    config_only: bool,
}

impl<W: Write> Printer<W> {
    /// Create a printer. With `config_only`, every section other than
    /// the config block becomes a no-op.
    pub fn new(w: W, no_color: bool, config_only: bool) -> Self {
        Printer {
            w,
            no_color,
            config_only,
        }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            style.force_styling(true).apply_to(text).to_string()
        }
    }

    // Label padded before styling so ANSI codes don't break alignment
    fn row(&mut self, label: &str, value: &str) {
        let padded = format!("{:<20}", label);
        let _ = writeln!(self.w, "  {} {}", self.paint(Style::new().dim(), &padded), value);
    }

    fn section(&mut self, style: Style, title: &str) {
        let _ = writeln!(self.w, "{}", self.paint(style, title));
        let _ = writeln!(self.w);
    }

    /// Program banner with a horizontal rule.
    pub fn print_header(&mut self, title: &str) {
        if self.config_only {
            return;
        }
        let _ = writeln!(self.w);
        let _ = writeln!(self.w, "{}", self.paint(Style::new().cyan().bold(), title));
        let _ = writeln!(
            self.w,
            "{}",
            self.paint(Style::new().dim(), &"\u{2500}".repeat(RULE_WIDTH))
        );
        let _ = writeln!(self.w);
    }

    /// Probed host resources.
    pub fn print_system_info(&mut self, system: &SystemMetrics) {
        if self.config_only {
            return;
        }
        self.section(Style::new().bold(), "System Information");
        self.row("Platform", &system.platform);
        self.row("CPU Cores", &system.cpu_cores.to_string());
        self.row("Total Memory", &format!("{} MB", system.total_memory_mb));
        self.row("Available Memory", &format!("{} MB", system.available_memory_mb));
        self.row("Used Memory", &format!("{} MB", system.used_memory_mb));
        let _ = writeln!(self.w);
    }

    /// Matched PHP worker processes, or a notice when there are none.
    pub fn print_php_info(&mut self, processes: &ProcessMetrics) {
        if self.config_only {
            return;
        }
        self.section(Style::new().bold(), "PHP-FPM Processes");
        if processes.count == 0 {
            let _ = writeln!(
                self.w,
                "{}",
                self.paint(Style::new().yellow(), "  No PHP-FPM processes detected")
            );
            let _ = writeln!(
                self.w,
                "{}",
                self.paint(
                    Style::new().dim(),
                    "  Using estimates based on php.ini memory_limit"
                )
            );
        } else {
            self.row("Process Count", &processes.count.to_string());
            self.row("Average Memory", &format!("{:.1} MB", processes.avg_memory_mb));
            self.row("Total Memory", &format!("{:.1} MB", processes.total_memory_mb));
        }
        let _ = writeln!(self.w);
    }

    /// Memory breakdown and the worker formula for the prefork pool.
    pub fn print_prefork_calculation(&mut self, cfg: &PreforkConfig) {
        if self.config_only {
            return;
        }
        self.section(Style::new().bold(), "Calculation");
        self.row(
            "Reserved Memory",
            &format!("{} MB (for OS/services)", cfg.reserved_memory_mb),
        );
        self.row("Available for PHP", &format!("{} MB", cfg.available_memory_mb));
        self.row("Process Memory", &format!("{:.1} MB", cfg.process_memory_mb));
        self.row(
            "Formula",
            &format!(
                "{} MB / {:.1} MB = {} workers",
                cfg.available_memory_mb, cfg.process_memory_mb, cfg.max_workers
            ),
        );
        let _ = writeln!(self.w);
    }

    /// The pool config block. This is the only section that still
    /// prints under `--config-only`.
    pub fn print_prefork_config(&mut self, cfg: &PreforkConfig) {
        if !self.config_only {
            self.section(Style::new().green().bold(), "Recommended Configuration");
        }

        let _ = writeln!(self.w, "pm = {}", cfg.pool_type);
        let _ = writeln!(self.w, "pm.max_children = {}", cfg.max_workers);

        if matches!(cfg.pool_type, PoolType::Dynamic | PoolType::OnDemand) {
            let _ = writeln!(self.w, "pm.process_idle_timeout = {}", cfg.idle_timeout);
        }
        if cfg.pool_type == PoolType::Dynamic {
            let _ = writeln!(self.w, "pm.start_servers = {}", cfg.start_workers);
            let _ = writeln!(self.w, "pm.min_spare_servers = {}", cfg.min_spare_workers);
            let _ = writeln!(self.w, "pm.max_spare_servers = {}", cfg.max_spare_workers);
        }
        let _ = writeln!(self.w, "pm.max_requests = {}", cfg.max_requests_per_worker);

        if !self.config_only {
            let _ = writeln!(self.w);
        }
    }

    /// Warnings section; omitted when empty.
    pub fn print_warnings(&mut self, warnings: &[String]) {
        if self.config_only || warnings.is_empty() {
            return;
        }
        self.section(Style::new().yellow().bold(), "Warnings");
        for warning in warnings {
            let _ = writeln!(
                self.w,
                "  {} {}",
                self.paint(Style::new().yellow(), "!"),
                warning
            );
        }
        let _ = writeln!(self.w);
    }

    /// Recommendations section; omitted when empty.
    pub fn print_recommendations(&mut self, recommendations: &[String]) {
        if self.config_only || recommendations.is_empty() {
            return;
        }
        self.section(Style::new().blue().bold(), "Recommendations");
        for rec in recommendations {
            let _ = writeln!(self.w, "  {} {}", self.paint(Style::new().cyan(), "*"), rec);
        }
        let _ = writeln!(self.w);
    }

    /// Manual apply instructions for PHP-FPM.
    pub fn print_prefork_usage(&mut self) {
        if self.config_only {
            return;
        }
        self.section(Style::new().bold(), "How to Apply");
        let _ = writeln!(self.w, "  1. Edit your PHP-FPM pool configuration:");
        let _ = writeln!(
            self.w,
            "{}",
            self.paint(Style::new().dim(), "     /etc/php/8.x/fpm/pool.d/www.conf")
        );
        let _ = writeln!(self.w);
        let _ = writeln!(self.w, "  2. Restart PHP-FPM:");
        let _ = writeln!(
            self.w,
            "{}",
            self.paint(Style::new().dim(), "     sudo systemctl restart php-fpm")
        );
        let _ = writeln!(self.w);
    }

    /// Memory breakdown and the thread formula for the worker server.
    pub fn print_worker_calculation(&mut self, cfg: &WorkerServerConfig) {
        if self.config_only {
            return;
        }
        self.section(Style::new().bold(), "Calculation");
        self.row(
            "Reserved Memory",
            &format!("{} MB (for OS/server)", cfg.reserved_memory_mb),
        );
        self.row("Available for PHP", &format!("{} MB", cfg.available_memory_mb));
        self.row("Thread Memory", &format!("{:.1} MB", cfg.thread_memory_mb));
        self.row(
            "Formula",
            &format!(
                "{} MB / {:.1} MB = {} threads",
                cfg.available_memory_mb, cfg.thread_memory_mb, cfg.num_threads
            ),
        );
        let _ = writeln!(self.w);
    }

    /// The Caddyfile-style config block for the worker server.
    pub fn print_worker_config(&mut self, cfg: &WorkerServerConfig) {
        if !self.config_only {
            self.section(Style::new().green().bold(), "Recommended Configuration");
        }

        let _ = writeln!(self.w, "{{");
        let _ = writeln!(self.w, "    frankenphp {{");
        let _ = writeln!(self.w, "        num_threads {}", cfg.num_threads);

        if cfg.max_threads > cfg.num_threads {
            let _ = writeln!(self.w, "        max_threads {}", cfg.max_threads);
        }
        if !cfg.max_wait_time.is_empty() {
            let _ = writeln!(self.w, "        max_wait_time {}", cfg.max_wait_time);
        }
        if cfg.worker_count > 0 {
            let _ = writeln!(self.w, "        worker {{");
            let _ = writeln!(self.w, "            file /path/to/your/public/index.php");
            let _ = writeln!(self.w, "            num {}", cfg.worker_count);
            let _ = writeln!(self.w, "        }}");
        }

        let _ = writeln!(self.w, "    }}");
        let _ = writeln!(self.w, "}}");

        if !self.config_only {
            let _ = writeln!(self.w);
        }
    }

    /// Manual apply instructions for the worker server.
    pub fn print_worker_usage(&mut self) {
        if self.config_only {
            return;
        }
        self.section(Style::new().bold(), "How to Apply");
        let _ = writeln!(self.w, "  1. Add the configuration to your Caddyfile:");
        let _ = writeln!(
            self.w,
            "{}",
            self.paint(Style::new().dim(), "     /etc/frankenphp/Caddyfile")
        );
        let _ = writeln!(
            self.w,
            "{}",
            self.paint(Style::new().dim(), "     or ./Caddyfile (current directory)")
        );
        let _ = writeln!(self.w);
        let _ = writeln!(self.w, "  2. Restart the server:");
        let _ = writeln!(self.w, "{}", self.paint(Style::new().dim(), "     frankenphp reload"));
        let _ = writeln!(
            self.w,
            "{}",
            self.paint(Style::new().dim(), "     # or with Docker:")
        );
        let _ = writeln!(
            self.w,
            "{}",
            self.paint(Style::new().dim(), "     docker compose restart")
        );
        let _ = writeln!(self.w);
    }
}
