use std::time::Duration;

/// Stats from stage one.
#[derive(Debug, Default, Clone)]
pub struct CollectStats {
    pub polls: u32,
    pub fragments_seen: u32,
    pub names_collected: u32,
    pub people: u32,
    pub rows_skipped: u32,
    pub poll_failed: bool,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl std::fmt::Display for CollectStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Collection Complete ===")?;
        writeln!(f, "Polls:              {}", self.polls)?;
        writeln!(f, "Fragments seen:     {}", self.fragments_seen)?;
        writeln!(f, "Names collected:    {}", self.names_collected)?;
        writeln!(f, "  People:           {}", self.people)?;
        if self.rows_skipped > 0 {
            writeln!(f, "  Rows skipped:     {}", self.rows_skipped)?;
        }
        writeln!(f, "Elapsed:            {:.1}s", self.elapsed.as_secs_f64())?;
        if self.poll_failed {
            writeln!(f, "Stopped early: page poll failed")?;
        }
        if self.interrupted {
            writeln!(f, "Stopped early: interrupted")?;
        }
        Ok(())
    }
}

/// Stats from stage two.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnrichStats {
    pub rows: u32,
    pub already_processed: u32,
    pub not_a_person: u32,
    pub resolved: u32,
    pub not_available: u32,
}

impl std::fmt::Display for EnrichStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Enrichment Complete ===")?;
        writeln!(f, "Rows:               {}", self.rows)?;
        writeln!(f, "Already processed:  {}", self.already_processed)?;
        writeln!(f, "Not a person:       {}", self.not_a_person)?;
        writeln!(f, "Counts resolved:    {}", self.resolved)?;
        writeln!(f, "Not available:      {}", self.not_available)?;
        Ok(())
    }
}
