use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use clap::Args;

use crate::infra::{seed_workforce, InMemoryNotifier, InMemoryVacationStore, UnitDirectory};
use ferias::error::AppError;
use ferias::workflows::vacation::{
    CycleLabel, EmployeeId, GrantTerms, LeaveType, VacationService,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for entitlement generation (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Days of balance the executive records on the grant.
    #[arg(long, default_value_t = 20)]
    pub(crate) balance: i64,
    /// Skip the rejection walkthrough at the end.
    #[arg(long)]
    pub(crate) skip_rejection: bool,
}

type DemoService = VacationService<InMemoryVacationStore, UnitDirectory, InMemoryNotifier>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        balance,
        skip_rejection,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let servidor = EmployeeId("1001".to_string());
    let gerente = EmployeeId("2001".to_string());
    let executiva = EmployeeId("3001".to_string());

    let store = Arc::new(InMemoryVacationStore::default());
    let directory = Arc::new(UnitDirectory::default());
    let notifier = Arc::new(InMemoryNotifier::default());
    seed_workforce(&store, &directory);
    let service: DemoService = VacationService::new(store, directory, notifier.clone());

    println!("Fluxo de férias (demonstração, dados em memória)");
    println!("Data de referência: {today}");

    let created = service.ensure_periods(&servidor, today)?;
    println!(
        "\nPeríodos aquisitivos gerados para a matrícula {}: {}",
        servidor.0,
        created.len()
    );
    let open = service.open_periods(&servidor)?;
    for period in &open {
        println!(
            "- {} ({} a {}), status {}",
            period.label, period.starts_on, period.ends_on, period.status
        );
    }

    let Some(period) = open.first() else {
        println!("Nenhum período em aberto; nada a solicitar.");
        return Ok(());
    };
    let label = period.label.clone();

    let starts_on = today + Duration::days(30);
    let ends_on = starts_on + Duration::days(9);
    let request = service.submit_request(&servidor, &label, starts_on, ends_on)?;
    println!(
        "\nSolicitação {} criada: {} a {} ({} dias), estágio {}",
        request.id, request.starts_on, request.ends_on, request.day_count, request.stage
    );

    let after_manager = service.decide(
        &request.id,
        &gerente,
        true,
        Some("De acordo".to_string()),
        None,
    )?;
    println!("Gerente aprovou -> estágio {}", after_manager.stage);

    let terms = GrantTerms {
        starts_on,
        ends_on,
        balance_days: balance,
        leave_type: LeaveType::Regular,
    };
    let approved = service.decide(&request.id, &executiva, true, None, Some(terms))?;
    println!("Executiva confirmou -> estágio {}", approved.stage);

    if let Some(grant) = service.grant_for(&request.id)? {
        println!(
            "Gozo registrado: {} a {}, saldo {} dias, tipo {}, ano {}",
            grant.starts_on,
            grant.ends_on,
            grant.balance_days,
            grant.leave_type.label(),
            grant.year
        );
    }

    println!("\nHistórico de decisões (mais recente primeiro):");
    for entry in service.history(&request.id)? {
        println!(
            "- {} por {} no estágio {} ({})",
            entry.decision,
            entry.actor,
            entry.stage,
            entry.observation.as_deref().unwrap_or("sem observação")
        );
    }

    if !skip_rejection {
        run_rejection_walkthrough(&service, today)?;
    }

    println!("\nNotificações enviadas:");
    for notice in notifier.notices() {
        println!("- para {}: {}", notice.recipient, notice.message);
    }

    Ok(())
}

fn run_rejection_walkthrough(service: &DemoService, today: NaiveDate) -> Result<(), AppError> {
    let servidora = EmployeeId("1002".to_string());
    let gerente = EmployeeId("2001".to_string());

    service.ensure_periods(&servidora, today)?;
    let open = service.open_periods(&servidora)?;
    let Some(period) = open.first() else {
        return Ok(());
    };
    let label: CycleLabel = period.label.clone();

    let starts_on = today + Duration::days(45);
    let request = service.submit_request(&servidora, &label, starts_on, starts_on + Duration::days(14))?;
    println!(
        "\nSegunda servidora solicitou {} a {} -> estágio {}",
        request.starts_on, request.ends_on, request.stage
    );

    service.decide(
        &request.id,
        &gerente,
        false,
        Some("Equipe reduzida no período".to_string()),
        None,
    )?;
    let reopened = service.open_periods(&servidora)?;
    println!(
        "Gerente reprovou; períodos novamente em aberto: {}",
        reopened.len()
    );

    Ok(())
}
