// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Best-effort job-number extraction from `lp` output, e.g.
//
//   request id is DeskJet_3630-123 (1 file(s))
//
// The text is not a documented protocol, so a miss is simply "no id".

use std::sync::LazyLock;

use regex::Regex;

/// Any `<queue>-<digits>` token, for backends that report a class member
/// rather than the queue we asked for.
static ANY_QUEUE_JOB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._-]+-(\d+)").expect("static job-id pattern"));

/// Extract the numeric job id for `queue` from backend output.
///
/// Tries `<queue>-<digits>` first, then any queue-shaped token.
pub fn extract_job_id(output: &str, queue: &str) -> Option<String> {
    let exact = Regex::new(&format!(r"{}-(\d+)", regex::escape(queue))).ok();
    exact
        .as_ref()
        .and_then(|re| re.captures(output))
        .or_else(|| ANY_QUEUE_JOB.captures(output))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}
