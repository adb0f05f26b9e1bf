//! `medlens lookup`: query the label database directly, without photos.

use anyhow::Result;
use clap::Args;
use medlens_core::{DrugLookup, IdentityRecord, LookupResult};
use medlens_understanding::fallback_links;

use crate::context::AppContext;
use crate::present;

#[derive(Args, Debug, Default)]
pub struct LookupArgs {
    /// National Drug Code as printed
    #[arg(long)]
    pub ndc: Option<String>,
    #[arg(long)]
    pub brand: Option<String>,
    #[arg(long)]
    pub generic: Option<String>,
    /// Dosage form, e.g. TABLET
    #[arg(long)]
    pub form: Option<String>,
    /// Scanned barcode digits (10/11-digit NDC or 12-digit UPC)
    #[arg(long)]
    pub barcode: Option<String>,
    /// Print the raw result as JSON
    #[arg(long)]
    pub json: bool,
}

impl LookupArgs {
    pub fn identity(&self) -> IdentityRecord {
        IdentityRecord {
            ndc: self.ndc.clone(),
            brand_name: self.brand.clone(),
            generic_name: self.generic.clone(),
            dosage_form: self.form.clone(),
            ..Default::default()
        }
    }
}

pub async fn run(ctx: &AppContext, args: LookupArgs) -> Result<()> {
    let identity = args.identity();
    let result = ctx.lookup_client()?.lookup(&identity, args.barcode.as_deref()).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    match &result {
        LookupResult::Found { drug, sources } => print!("{}", present::render_found(drug, sources)),
        LookupResult::NotFound => {
            let query = identity.display_name().or(identity.ndc.clone()).or(args.barcode.clone());
            let links = query.map(|q| fallback_links(&q)).unwrap_or_default();
            print!("{}", present::render_not_found(&identity, &links));
        }
    }
    Ok(())
}
