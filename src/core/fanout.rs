// splitter fan-out: one step for the splitter, then one end step per physical output
use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::core::model::{Splitter, SplitterOutput};
use crate::core::snapshot::NetworkSnapshot;
use crate::core::step::{EndCause, PathStep, StepKind};

/// Largest capacity listed in full; real splitters top out at 1:64.
pub const MAX_SPLITTER_OUTPUTS: u32 = 128;

impl NetworkSnapshot {
    /// Expands a splitter into its full output listing.
    ///
    /// Output numbers `1..=capacity` are always listed, merged with any recorded
    /// output numbers beyond that. Bound fibers get a single-hop lookahead to name
    /// the element at the other end of the span; branches are never walked further.
    pub fn fan_out(&self, splitter: &Splitter) -> Vec<PathStep> {
        let declared = splitter.output_count();
        let listed = if declared > MAX_SPLITTER_OUTPUTS {
            warn!(
                splitter = %splitter.info.id,
                declared,
                max = MAX_SPLITTER_OUTPUTS,
                "implausible splitter capacity, listing recorded outputs only"
            );
            0
        } else {
            declared
        };
        let numbers: BTreeSet<u32> = (1..=listed)
            .chain(splitter.outputs.iter().map(|o| o.output_number))
            .collect();

        let mut steps = Vec::with_capacity(numbers.len() + 1);
        steps.push(
            PathStep::new(
                StepKind::Splitter,
                &splitter.info.id,
                splitter.info.display_name(),
                format!(
                    "Splitter input {}. Signal splits into {} outputs.",
                    splitter.ratio_label(),
                    numbers.len()
                ),
            )
            .with_status(splitter.info.state),
        );

        if numbers.is_empty() {
            steps.push(PathStep::end(
                EndCause::NoOutputs,
                &splitter.info.id,
                "End of trace (Splitter)",
                "Splitter has no outputs configured.",
            ));
            return steps;
        }

        for n in numbers {
            let mut records = splitter.outputs.iter().filter(|o| o.output_number == n);
            let step = match records.next() {
                Some(output) => {
                    if records.next().is_some() {
                        warn!(
                            splitter = %splitter.info.id,
                            output = n,
                            "duplicate splitter output records, using the first"
                        );
                    }
                    self.describe_output(splitter, output)
                }
                None => PathStep::end(
                    EndCause::SplitterOutput,
                    format!("{}/output-{}", splitter.info.id, n),
                    format!("Output {n}"),
                    format!("Output {n}: not recorded. Unconfigured."),
                ),
            };
            steps.push(step);
        }

        debug!(splitter = %splitter.info.id, outputs = steps.len() - 1, "fan-out expanded");
        steps
    }

    fn describe_output(&self, splitter: &Splitter, output: &SplitterOutput) -> PathStep {
        let n = output.output_number;
        let mut details = format!("Output {n}: {}.", output.status);

        if let Some(far) = output.far_end() {
            match self.fiber(&far.fiber_id) {
                Some(fiber) => {
                    details.push_str(&format!(
                        " Connected to fiber {} (thread {}).",
                        fiber.display_name(),
                        far.thread
                    ));
                    let (kind, next_id) = fiber.far_end_from(&splitter.info.id);
                    match kind.and_then(|k| self.element(k, next_id)) {
                        Some(next) => details.push_str(&format!(" Span ends at {}.", next.name())),
                        None => details.push_str(&format!(" Destination id: {next_id}.")),
                    }
                }
                None => details.push_str(&format!(
                    " Connected to fiber id {} (thread {}).",
                    far.fiber_id, far.thread
                )),
            }
            if let Some(service) = &output.service_name {
                details.push_str(&format!(" Service: {service}."));
            }
        } else if let Some(service) = &output.service_name {
            details.push_str(&format!(" Service: {service}."));
        } else if let Some(label) = &output.destination_label {
            details.push_str(&format!(" Destination: {label}."));
        } else {
            details.push_str(" Unconfigured.");
        }

        PathStep::end(EndCause::SplitterOutput, &output.id, format!("Output {n}"), details)
            .with_status(output.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{CajaNap, Fiber};
    use crate::core::types::ElementKind;

    fn mk_splitter() -> Splitter {
        Splitter::new("S1", "Splitter 1 NAP-001", "1:4")
            .with_output(SplitterOutput::new("o1", 1).with_service("Cliente A"))
            .with_output(SplitterOutput::new("o3", 3).bound_to("F9", 2))
            .with_output(SplitterOutput::new("o2", 2))
    }

    #[test]
    fn fan_out_lists_every_output_in_number_order() {
        let mut s = NetworkSnapshot::new();
        s.add_caja_nap(CajaNap::new("N7", "NAP Edif. Los Andes")).unwrap();
        s.add_fiber(Fiber::new(
            "F9",
            "Drop Los Andes",
            (ElementKind::Splitter, "S1"),
            (ElementKind::CajaNap, "N7"),
            4,
        ))
        .unwrap();

        let steps = s.fan_out(&mk_splitter());

        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0].kind, StepKind::Splitter);
        assert!(steps[0].details.contains("1:4"));
        assert!(steps[1..].iter().all(|st| st.cause == Some(EndCause::SplitterOutput)));

        let names: Vec<&str> = steps[1..].iter().map(|st| st.element_name.as_str()).collect();
        assert_eq!(names, vec!["Output 1", "Output 2", "Output 3", "Output 4"]);

        assert!(steps[1].details.contains("Service: Cliente A"));
        assert!(steps[2].details.contains("Unconfigured"));
        assert!(steps[3].details.contains("Drop Los Andes"));
        assert!(steps[3].details.contains("Span ends at NAP Edif. Los Andes"));
        assert_eq!(steps[4].element_id, "S1/output-4");
        assert!(steps[4].details.contains("Unconfigured"));
        assert!(steps[4].status.is_none());
    }

    #[test]
    fn fan_out_names_unknown_fiber_by_id() {
        let s = NetworkSnapshot::new();
        let steps = s.fan_out(&mk_splitter());
        assert!(steps[3].details.contains("fiber id F9"));
    }

    #[test]
    fn garbled_large_ratio_lists_recorded_outputs_only() {
        let s = NetworkSnapshot::new();
        let garbled = Splitter::new("S1", "Garbled", "1:2000000")
            .with_output(SplitterOutput::new("o2", 2).with_service("Cliente B"))
            .with_output(SplitterOutput::new("o7", 7));

        let steps = s.fan_out(&garbled);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].element_name, "Output 2");
        assert_eq!(steps[2].element_name, "Output 7");

        let at_cap = Splitter::new("S2", "Big", &format!("1:{MAX_SPLITTER_OUTPUTS}"));
        assert_eq!(s.fan_out(&at_cap).len(), MAX_SPLITTER_OUTPUTS as usize + 1);

        let no_records = Splitter::new("S3", "Garbled", "1:99999");
        let steps = s.fan_out(&no_records);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].cause, Some(EndCause::NoOutputs));
    }

    #[test]
    fn splitter_without_outputs_ends_once() {
        let s = NetworkSnapshot::new();
        let mut empty = Splitter::new("S0", "Empty", "none");
        empty.info.capacity = 0;

        let steps = s.fan_out(&empty);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].cause, Some(EndCause::NoOutputs));
    }
}
