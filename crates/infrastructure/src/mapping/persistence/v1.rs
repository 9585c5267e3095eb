use domainwall_domain::DomainRecord;

use super::format::read_mapping_lines;

/// Version 1: the version line followed by mapping lines.
pub(super) fn read<'a>(body: impl Iterator<Item = &'a str>) -> Vec<DomainRecord> {
    read_mapping_lines(body)
}
