use chrono::Local;
use clap::{Parser, ValueEnum};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::fs;
use std::path::PathBuf;

use ifc_estimator::catalogue::load_catalogue;
use ifc_estimator::config::{CatalogueColumns, CsvFormat, Encoding, EstimateConfig};
use ifc_estimator::export::{
    boq_document, cost_output_path, export_csv, export_ifc, export_json, render_boq,
    render_boq_totals, render_profiles, render_qto, render_qto_totals, write_report,
};
use ifc_estimator::model::ElementClass;
use ifc_estimator::parser::parse_ifc_file;
use ifc_estimator::report::{profile_schedule, quantity_take_off, UnavailablePolicy};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnavailableArg {
    /// Count the element as one unit of measure
    One,
    /// Leave the element out of quantities
    Exclude,
}

impl From<UnavailableArg> for UnavailablePolicy {
    fn from(arg: UnavailableArg) -> Self {
        match arg {
            UnavailableArg::One => Self::CountAsOne,
            UnavailableArg::Exclude => Self::Exclude,
        }
    }
}

fn parse_class(value: &str) -> Result<ElementClass, String> {
    ElementClass::from_ifc_name(value).ok_or_else(|| format!("not a structural class: {value}"))
}

#[derive(Parser, Debug)]
#[command(name = "ifc-estimator")]
#[command(about = "IFC Estimator - quantity take-off and bill of quantities from IFC files")]
#[command(version)]
struct Args {
    /// Path to IFC file
    #[arg(required = true)]
    file: PathBuf,

    /// Price catalogue (CSV)
    #[arg(required = true, env = "ESTIMATOR_PRICES")]
    prices: PathBuf,

    /// Directory for reports and the annotated model
    #[arg(long, short, value_name = "DIR", env = "ESTIMATOR_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Cost schedule that receives new cost items
    #[arg(long, env = "ESTIMATOR_SCHEDULE", default_value = "Price List")]
    schedule: String,

    /// Catalogue field delimiter
    #[arg(long, env = "ESTIMATOR_DELIMITER", default_value_t = ';')]
    delimiter: char,

    /// Catalogue text encoding (utf-8 or cp1252)
    #[arg(long, env = "ESTIMATOR_ENCODING", default_value = "cp1252")]
    encoding: Encoding,

    /// Currency code written to the JSON report
    #[arg(long, env = "ESTIMATOR_CURRENCY", default_value = "DKK")]
    currency: String,

    /// Report one line per cost item instead of per item and level
    #[arg(long)]
    no_levels: bool,

    /// Quantity used for elements whose quantity cannot be derived
    #[arg(long, value_enum, env = "ESTIMATOR_UNAVAILABLE", default_value = "one")]
    unavailable: UnavailableArg,

    /// Catalogue column holding the item code
    #[arg(long, value_name = "COLUMN")]
    code_column: Option<String>,

    /// Catalogue column holding the unit price
    #[arg(long, value_name = "COLUMN")]
    price_column: Option<String>,

    /// Also write the profile schedule
    #[arg(long)]
    profiles: bool,

    /// Restrict the profile schedule to one class (e.g. IfcColumn)
    #[arg(long, value_name = "CLASS", value_parser = parse_class, requires = "profiles")]
    profile_class: Option<ElementClass>,
}

impl Args {
    fn config(&self) -> Result<EstimateConfig> {
        let delimiter = u8::try_from(self.delimiter)
            .map_err(|_| eyre!("delimiter must be a single-byte character"))?;

        let mut columns = CatalogueColumns::default();
        if let Some(code) = &self.code_column {
            columns.code.clone_from(code);
        }
        if let Some(price) = &self.price_column {
            columns.unit_price.clone_from(price);
        }

        Ok(EstimateConfig {
            columns,
            csv: CsvFormat {
                delimiter,
                encoding: self.encoding,
            },
            schedule_name: self.schedule.clone(),
            currency: self.currency.clone(),
            group_by_level: !self.no_levels,
            unavailable: self.unavailable.into(),
            output_dir: self.output_dir.clone(),
        })
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config()?;

    let mut model = parse_ifc_file(&args.file)?;
    let rows = load_catalogue(&args.prices, &config.columns, &config.csv)?;

    let summary = model.assign_costs(&rows, &config.schedule_name);
    model
        .costs
        .refresh_units(rows.iter().map(|row| (row.code.as_str(), row.unit.as_str())));

    fs::create_dir_all(&config.output_dir)?;
    let out = |name: &str| config.output_dir.join(name);
    let today = Local::now().date_naive();
    let mut written = Vec::new();

    let qto = quantity_take_off(&model.elements);
    for (name, content) in [
        ("QTO.txt", render_qto(&qto, today)),
        ("QTO_total.txt", render_qto_totals(&qto, today)),
    ] {
        write_report(out(name), &content)?;
        written.push(out(name));
    }

    let bill = model.bill_of_quantities(config.group_by_level, config.unavailable);
    for (name, content) in [
        ("BOQ.txt", render_boq(&bill, today)),
        ("BOQ_total.txt", render_boq_totals(&bill, today)),
    ] {
        write_report(out(name), &content)?;
        written.push(out(name));
    }

    export_json(&boq_document(&bill, &config.currency, today), out("BOQ.json"))?;
    written.push(out("BOQ.json"));
    export_csv(&bill, out("BOQ.csv"))?;
    written.push(out("BOQ.csv"));

    if args.profiles {
        let groups = profile_schedule(&model.elements, args.profile_class);
        write_report(out("profiles.txt"), &render_profiles(&groups))?;
        written.push(out("profiles.txt"));
    }

    let annotated = cost_output_path(&args.file, &config.output_dir);
    export_ifc(&mut model, &annotated)?;
    written.push(annotated);

    for path in &written {
        println!("Written: {}", path.display());
    }
    println!(
        "Elements: {} | assigned: {} | already linked: {} | no candidates: {} | no match: {} | malformed price: {}",
        summary.processed(),
        summary.assigned,
        summary.already_linked,
        summary.skipped_no_candidates,
        summary.skipped_no_match,
        summary.skipped_malformed,
    );
    if summary.unrecognized_units > 0 {
        println!("Unrecognized units: {}", summary.unrecognized_units);
    }
    if bill.unavailable > 0 {
        println!("Elements with unavailable quantity: {}", bill.unavailable);
    }
    println!("Grand total: {:.2} {}", bill.grand_total, config.currency);

    Ok(())
}
