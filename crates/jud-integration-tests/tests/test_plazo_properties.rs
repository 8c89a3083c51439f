//! # Property Tests: Calendar and Plazo Invariants
//!
//! Random event sequences with random day gaps are replayed against the
//! state machine. Whatever the sequence, a proceso never holds two ACTIVO
//! plazos of the same kind, a rejected event never changes the proceso, and
//! due dates always land on business days.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use jud_core::{BusinessDayCalculator, FixedHolidays, Nurej, Timestamp};
use jud_state::{
    transition_rule, Allanamiento, BorradorSentencia, ContestacionPayload, Contestar,
    CuerpoSentencia, Evento, ExcepcionItem, Excepciones, Money, Parte, PlazoConfig, PlazoError,
    PlazoStatus, Proceso, ProcesoError, ProcesoStateMachine, Reconvencion, TipoContestacion,
    TipoExcepcion,
};

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
}

fn payload(tipo: TipoContestacion) -> ContestacionPayload {
    match tipo {
        TipoContestacion::Contestar => ContestacionPayload::Contestar(Contestar {
            refutacion_hechos: "Niega".into(),
            refutacion_derecho: "No aplica".into(),
            ofrecimiento_prueba: vec![],
            anexos: vec![],
        }),
        TipoContestacion::Excepciones => ContestacionPayload::Excepciones(Excepciones {
            excepciones: vec![ExcepcionItem {
                tipo: TipoExcepcion::CosaJuzgada,
                fundamento: "Sentencia 12/2024 ejecutoriada".into(),
            }],
            anexos: vec![],
        }),
        TipoContestacion::Reconvencion => ContestacionPayload::Reconvencion(Reconvencion {
            objeto: "Daños".into(),
            hechos: "Incumplimiento".into(),
            derecho: "Art. 339 CC".into(),
            petitorio: "Pago".into(),
            valor: Some(Money::new("800.50", "USD")),
            ofrecimiento_prueba: vec![],
            anexos: vec![],
        }),
        TipoContestacion::Allanamiento => ContestacionPayload::Allanamiento(Allanamiento {
            acepta_hechos: true,
            acepta_pretensiones: true,
            acepta_consecuencias: true,
            irrevocable: true,
            motivo: None,
        }),
    }
}

fn borrador() -> BorradorSentencia {
    BorradorSentencia {
        cuerpo: CuerpoSentencia {
            encabezamiento: "SENTENCIA".into(),
            narrativa: "VISTOS".into(),
            motiva: "CONSIDERANDO".into(),
            resolutiva: "POR TANTO".into(),
        },
        resultado_actor: Some("FAVORABLE".into()),
        resultado_demandado: Some("DESFAVORABLE".into()),
    }
}

/// One step of a random history: an event index (or a sweep when the index
/// is past the event list) and the days elapsed since the previous step.
fn steps() -> impl Strategy<Value = Vec<(usize, i64)>> {
    let events = Evento::all().len();
    prop::collection::vec((0..=events, 0i64..25), 1..40)
}

fn apply(
    machine: &ProcesoStateMachine,
    proceso: &mut Proceso,
    evento: Evento,
    at: Timestamp,
) -> Result<(), ProcesoError> {
    match evento {
        Evento::Contestar { tipo } => machine.contestar(proceso, payload(tipo), at).map(|_| ()),
        Evento::EmitirSentencia => machine.emitir_sentencia(proceso, borrador(), at).map(|_| ()),
        other => machine.transition(proceso, other, at).map(|_| ()),
    }
}

proptest! {
    /// At most one ACTIVO plazo per kind after every step of any history.
    #[test]
    fn random_histories_keep_plazos_consistent(history in steps()) {
        let machine = ProcesoStateMachine::default();
        let events = Evento::all();
        let mut today = epoch();
        let mut proceso = Proceso::new(
            Nurej::new("CBA2026000007").unwrap(),
            "civil",
            "Juzgado Público Civil 2º de Cochabamba",
            vec![Parte::actor("Elena Torrez"), Parte::demandado("Marco Arce")],
            None,
            Timestamp::start_of(today),
        )
        .unwrap();

        for (index, gap) in history {
            today += Duration::days(gap);
            let at = Timestamp::start_of(today);

            let Some(evento) = events.get(index).copied() else {
                let flipped = machine.sweep_expirations(&mut proceso, today);
                prop_assert!(flipped.iter().all(|p| p.status == PlazoStatus::Vencido && p.due_on < today));
                prop_assert!(proceso.active_plazos_unique());
                continue;
            };

            let before = proceso.clone();
            match apply(&machine, &mut proceso, evento, at) {
                Ok(()) => {
                    let expected = transition_rule(before.estado, &evento).map(|r| r.to);
                    prop_assert_eq!(Some(proceso.estado), expected);
                    prop_assert_eq!(proceso.transitions.len(), before.transitions.len() + 1);
                    prop_assert!(proceso.plazos.len() >= before.plazos.len());
                }
                Err(e) => {
                    prop_assert!(
                        !matches!(e, ProcesoError::Plazo(PlazoError::ConflictingPlazo { .. })),
                        "conflicting plazo after {:?}", evento
                    );
                    prop_assert_eq!(&proceso, &before);
                }
            }
            prop_assert!(proceso.active_plazos_unique());
            for plazo in &proceso.plazos {
                prop_assert!(plazo.due_on >= plazo.opened_on);
                prop_assert_eq!(plazo.resolved_on.is_some(), plazo.status != PlazoStatus::Activo);
            }
        }
    }

    /// Adding N business days lands on a business day exactly N business
    /// days after the rolled-forward base.
    #[test]
    fn add_business_days_counts_exactly(
        base_offset in 0i64..730,
        n in 0u32..60,
        holiday_offsets in prop::collection::btree_set(0i64..800, 0..40),
    ) {
        let holidays = holiday_offsets.iter().map(|o| epoch() + Duration::days(*o));
        let calendar = BusinessDayCalculator::new(FixedHolidays::new(holidays));
        let base = epoch() + Duration::days(base_offset);

        let due = calendar.add_business_days(base, n).unwrap();
        prop_assert!(calendar.is_business_day(due));
        prop_assert!(due >= base);

        let start = calendar.roll_forward(base).unwrap();
        prop_assert_eq!(calendar.business_days_between(start, due), n);
    }

    /// Business-day counts agree in sign with calendar-day counts.
    #[test]
    fn remaining_counts_agree_in_sign(due_offset in 0i64..120, today_offset in 0i64..120) {
        let calendar = BusinessDayCalculator::default();
        let due = epoch() + Duration::days(due_offset);
        let today = epoch() + Duration::days(today_offset);

        let dias = BusinessDayCalculator::days_remaining(epoch(), due, today);
        let habiles = calendar.business_days_remaining(due, today);
        prop_assert!(habiles.abs() <= dias.abs());
        prop_assert!(dias >= 0 || habiles <= 0);
        prop_assert!(dias <= 0 || habiles >= 0);
    }

    /// Longer configured plazos never produce earlier due dates.
    #[test]
    fn due_dates_are_monotonic_in_length(base_offset in 0i64..365, a in 1u32..40, b in 1u32..40) {
        let calendar = BusinessDayCalculator::default();
        let base = epoch() + Duration::days(base_offset);
        let (short, long) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            calendar.add_business_days(base, short).unwrap()
                <= calendar.add_business_days(base, long).unwrap()
        );
    }
}

#[test]
fn default_lengths_are_all_positive() {
    assert!(PlazoConfig::default().validate().is_ok());
}
