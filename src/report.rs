use crate::models::{CustomerProfile, Preference};
use crate::quote::{
    QuoteEstimate, AVG_ELECTRICITY_COST_EUR_PER_KWH, GRID_FEED_IN_TARIFF_EUR_PER_KWH,
    KWH_PER_KWP_YEAR, SELF_CONSUMPTION_RATE,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Renders the downloadable quote document as Markdown.
///
/// Mirrors the sections of the printed quote: customer info, recommended
/// system, savings highlight, financial analysis, preferences, calculation
/// assumptions, disclaimer. Deterministic given (profile, quote, date,
/// reference).
pub fn render_quote_document(
    profile: &CustomerProfile,
    quote: &QuoteEstimate,
    generated_at: DateTime<Utc>,
    reference: Uuid,
) -> String {
    let mut doc = String::new();

    doc.push_str("# Preventivo Impianto Fotovoltaico\n\n");
    doc.push_str(&format!(
        "Generato il {} — Rif. {}\n\n",
        generated_at.format("%d/%m/%Y"),
        reference
    ));

    // ---- Customer information ----
    doc.push_str("## Informazioni Cliente\n\n");
    if let Some(ref cap) = profile.cap {
        doc.push_str(&format!("- CAP: {}\n", cap));
    }
    if let Some(dwelling) = profile.dwelling {
        doc.push_str(&format!("- Tipo Abitazione: {}\n", dwelling.label()));
    }
    if let Some(kwh) = profile.monthly_kwh {
        doc.push_str(&format!(
            "- Consumo Mensile: {} kWh\n",
            format_int_it(kwh.round() as i64)
        ));
    }
    if let Some(bill) = profile.bill_eur {
        doc.push_str(&format!(
            "- Bolletta Mensile: €{}\n",
            format_int_it(bill.round() as i64)
        ));
    }
    doc.push('\n');

    // ---- Recommended system ----
    doc.push_str("## Dettagli Impianto Consigliato\n\n");
    doc.push_str(&format!(
        "- Potenza Impianto: {:.1} kWp\n",
        quote.system_size_kwp
    ));
    doc.push_str(&format!(
        "- Produzione Annuale Stimata: {} kWh\n",
        format_int_it(quote.annual_production_kwh)
    ));
    doc.push_str(&format!(
        "- Autosufficienza Energetica: {}%\n\n",
        quote.self_sufficiency_percent
    ));

    doc.push_str(&format!(
        "> **Risparmio Annuale Stimato: €{}**\n\n",
        format_eur_it(quote.annual_savings_eur)
    ));

    // ---- Financial analysis ----
    doc.push_str("## Analisi Economica\n\n");
    doc.push_str(&format!(
        "- Bolletta Attuale (mensile): €{}\n",
        format_int_it(quote.current_monthly_bill_eur)
    ));
    doc.push_str(&format!(
        "- Bolletta con Fotovoltaico (mensile): €{}\n",
        format_int_it(quote.projected_monthly_bill_eur)
    ));
    doc.push_str(&format!(
        "- Risparmio Mensile: €{}\n",
        format_int_it(quote.current_monthly_bill_eur - quote.projected_monthly_bill_eur)
    ));
    doc.push_str(&format!(
        "- Risparmio Annuale: €{}\n\n",
        format_eur_it(quote.annual_savings_eur)
    ));

    // ---- Customer preferences ----
    if let Some(storage) = profile.storage_pref {
        doc.push_str("## Preferenze Cliente\n\n");
        doc.push_str(&format!(
            "- Sistema di Accumulo: {}\n\n",
            preference_label(storage)
        ));
    }

    // ---- Assumptions ----
    doc.push_str("## Assunzioni di Calcolo\n\n");
    doc.push_str(&format!(
        "- Produzione annuale: {} kWh per kWp installato (media Italia)\n",
        format_int_it(KWH_PER_KWP_YEAR as i64)
    ));
    doc.push_str(&format!(
        "- Costo energia elettrica: €{}/kWh\n",
        format_eur_it(AVG_ELECTRICITY_COST_EUR_PER_KWH)
    ));
    doc.push_str(&format!(
        "- Autoconsumo: {}% dell'energia prodotta\n",
        (SELF_CONSUMPTION_RATE * 100.0) as i64
    ));
    doc.push_str(&format!(
        "- Tariffa immissione in rete: €{}/kWh\n\n",
        format_eur_it(GRID_FEED_IN_TARIFF_EUR_PER_KWH)
    ));

    doc.push_str(
        "*Stima preliminare non vincolante. Un sopralluogo tecnico è necessario \
         per un preventivo definitivo.*\n",
    );

    doc
}

/// Storage preference label for the document.
fn preference_label(pref: Preference) -> &'static str {
    match pref {
        Preference::Si => "Interessato",
        Preference::No => "Non Interessato",
        Preference::NonSo => "Da Valutare",
    }
}

/// Integer with it-IT thousands separators: 120150 -> "120.150".
fn format_int_it(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Amount with it-IT separators and two decimals: 916.65 -> "916,65".
fn format_eur_it(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let whole = cents / 100;
    let frac = (cents % 100).abs();
    format!("{},{:02}", format_int_it(whole), frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dwelling;
    use crate::quote;

    fn sample_profile() -> CustomerProfile {
        CustomerProfile {
            cap: Some("50100".to_string()),
            dwelling: Some(Dwelling::CasaSingola),
            monthly_kwh: Some(300.0),
            bill_eur: None,
            storage_pref: Some(Preference::Si),
            incentives: Some(Preference::NonSo),
        }
    }

    #[test]
    fn test_it_number_formatting() {
        assert_eq!(format_int_it(0), "0");
        assert_eq!(format_int_it(999), "999");
        assert_eq!(format_int_it(4050), "4.050");
        assert_eq!(format_int_it(120150), "120.150");
        assert_eq!(format_int_it(-1234), "-1.234");

        assert_eq!(format_eur_it(916.65), "916,65");
        assert_eq!(format_eur_it(785.7), "785,70");
        assert_eq!(format_eur_it(0.25), "0,25");
        assert_eq!(format_eur_it(1234.5), "1.234,50");
    }

    #[test]
    fn test_document_contains_all_sections() {
        let profile = sample_profile();
        let quote = quote::estimate(&profile);
        let doc = render_quote_document(&profile, &quote, Utc::now(), Uuid::nil());

        assert!(doc.contains("# Preventivo Impianto Fotovoltaico"));
        assert!(doc.contains("## Informazioni Cliente"));
        assert!(doc.contains("- CAP: 50100"));
        assert!(doc.contains("- Tipo Abitazione: Casa Singola"));
        assert!(doc.contains("## Dettagli Impianto Consigliato"));
        assert!(doc.contains("- Potenza Impianto: 3.0 kWp"));
        assert!(doc.contains("- Produzione Annuale Stimata: 4.050 kWh"));
        assert!(doc.contains("Risparmio Annuale Stimato: €785,70"));
        assert!(doc.contains("## Analisi Economica"));
        assert!(doc.contains("- Sistema di Accumulo: Interessato"));
        assert!(doc.contains("## Assunzioni di Calcolo"));
    }

    #[test]
    fn test_document_skips_absent_customer_fields() {
        let profile = CustomerProfile {
            bill_eur: Some(95.0),
            ..Default::default()
        };
        let quote = quote::estimate(&profile);
        let doc = render_quote_document(&profile, &quote, Utc::now(), Uuid::nil());

        assert!(!doc.contains("- CAP:"));
        assert!(!doc.contains("- Tipo Abitazione:"));
        assert!(!doc.contains("## Preferenze Cliente"));
        assert!(doc.contains("- Bolletta Mensile: €95"));
    }

    #[test]
    fn test_document_is_deterministic() {
        let profile = sample_profile();
        let quote = quote::estimate(&profile);
        let when = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let reference = Uuid::nil();

        let a = render_quote_document(&profile, &quote, when, reference);
        let b = render_quote_document(&profile, &quote, when, reference);
        assert_eq!(a, b);
        assert!(a.contains("Generato il 01/03/2025"));
    }
}
