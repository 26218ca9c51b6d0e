use anyhow::Context;
use care_advisor::{
    Advisor, AdvisorConfig, Advisory, GeminiClient, RECENT_LOG_WINDOW, VITALS_HISTORY_WINDOW,
};
use care_core::{vitals_series, CareStore, Resident, VitalSigns};
use chrono::Utc;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "care-cli",
    about = "Console de acompanhamento de residentes (ILPI)."
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lista os residentes cadastrados.
    Residents,
    /// Registros de um residente, mais recentes primeiro.
    Logs { id: String },
    /// Série de sinais vitais pronta para gráfico, mais antigos primeiro.
    Vitals { id: String },
    /// Resumo clínico gerado por IA a partir dos registros recentes.
    Summary { id: String },
    /// Sugestões de atividades geradas por IA.
    Activities { id: String },
    /// Verificação de anomalia dos sinais vitais mais recentes.
    Check { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let store = CareStore::seeded(Utc::now());

    match args.command {
        Command::Residents => {
            for resident in store.residents() {
                println!(
                    "{} | {} | quarto {} | {} anos | {}",
                    resident.id,
                    resident.name,
                    resident.room_number,
                    resident.age,
                    resident.mobility_status.as_str(),
                );
            }
        }
        Command::Logs { id } => {
            let _ = find_resident(&store, &id)?;
            for log in store.logs_for_resident(&id) {
                println!(
                    "[{}] {}: {} ({})",
                    log.timestamp.format("%d/%m/%Y %H:%M"),
                    log.log_type.as_str(),
                    log.description,
                    log.staff_name,
                );
            }
        }
        Command::Vitals { id } => {
            let _ = find_resident(&store, &id)?;
            let logs = store.logs_for_resident(&id);
            for point in vitals_series(&logs) {
                println!(
                    "{} | PA {}/{} | FC {} bpm | {:.1}C | SpO2 {}%",
                    point.full_date,
                    point.systolic,
                    point.diastolic,
                    point.heart_rate,
                    point.temperature,
                    point.oxygen_saturation,
                );
            }
        }
        Command::Summary { id } => {
            let resident = find_resident(&store, &id)?.clone();
            let logs = store.logs_for_resident(&id);
            let recent = &logs[..logs.len().min(RECENT_LOG_WINDOW)];
            let advisor = build_advisor()?;
            print_advisory(advisor.clinical_summary(&resident, recent).await);
        }
        Command::Activities { id } => {
            let resident = find_resident(&store, &id)?.clone();
            let advisor = build_advisor()?;
            match advisor.suggest_activities(&resident).await {
                Advisory::Generated(titles) => print_titles(&titles),
                Advisory::Degraded { value, reason } => {
                    eprintln!("(sugestões padrão; falha na IA: {reason})");
                    print_titles(&value);
                }
            }
        }
        Command::Check { id } => {
            let _ = find_resident(&store, &id)?;
            let logs = store.logs_for_resident(&id);
            let series = vitals_series(&logs);
            let Some((latest, earlier)) = series.split_last() else {
                println!("Sem sinais vitais registrados.");
                return Ok(());
            };
            let current = VitalSigns {
                systolic: latest.systolic,
                diastolic: latest.diastolic,
                heart_rate: latest.heart_rate,
                temperature: latest.temperature,
                oxygen_saturation: latest.oxygen_saturation,
            };
            let history = &earlier[earlier.len().saturating_sub(VITALS_HISTORY_WINDOW)..];
            let advisor = build_advisor()?;
            match advisor.check_vitals_anomaly(&current, history).await {
                Advisory::Generated(Some(alert)) => println!("ALERTA AI: {alert}"),
                Advisory::Generated(None) => println!("Sinais vitais dentro do esperado."),
                Advisory::Degraded { reason, .. } => {
                    println!("Verificação indisponível ({reason}).");
                }
            }
        }
    }

    Ok(())
}

fn find_resident<'a>(store: &'a CareStore, id: &str) -> anyhow::Result<&'a Resident> {
    store
        .resident(id)
        .with_context(|| format!("residente {id} não encontrado"))
}

fn build_advisor() -> anyhow::Result<Advisor<GeminiClient>> {
    let config = AdvisorConfig::from_env();
    anyhow::ensure!(
        !config.api_key.is_empty(),
        "defina GEMINI_API_KEY (ou API_KEY) no ambiente ou em um arquivo .env"
    );
    Ok(Advisor::new(GeminiClient::new(config)?))
}

fn print_advisory(advisory: Advisory<String>) {
    match advisory {
        Advisory::Generated(text) => println!("{text}"),
        Advisory::Degraded { value, reason } => {
            eprintln!("(resposta de contingência; falha na IA: {reason})");
            println!("{value}");
        }
    }
}

fn print_titles(titles: &[String]) {
    for (index, title) in titles.iter().enumerate() {
        println!("{}. {title}", index + 1);
    }
}
