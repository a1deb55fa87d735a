//! Planes: the per-DUT, per-event collection of decoded hits.

use crate::{Cluster, ClusteringAlgorithm, Hit};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Known detector families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorType {
    Mimosa26,
    Fortis,
    Depfet,
    Apix,
    Usbpix,
    UsbpixI4,
    Explorer,
    PAlpide,
    Alpide,
    Dpts,
    Ce65,
    Apts,
    Opamp,
    Rd53a,
    Rd53b,
    Rd53bQuad,
    CaenDt5742,
    Etroc,
    Unknown,
}

impl SensorType {
    /// Identifies the sensor family from a plane or producer name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "MIMOSA26" => return Self::Mimosa26,
            "FORTIS" => return Self::Fortis,
            "DEPFET" => return Self::Depfet,
            "APIX" => return Self::Apix,
            "USBPIX" => return Self::Usbpix,
            "USBPIXI4" | "USBPIXI4B" => return Self::UsbpixI4,
            "Explorer20x20" | "Explorer30x30" => return Self::Explorer,
            "pALPIDEfs" => return Self::PAlpide,
            "ALPIDE" => return Self::Alpide,
            "DPTS" => return Self::Dpts,
            "CE65" => return Self::Ce65,
            "APTS" => return Self::Apts,
            "OPAMP" => return Self::Opamp,
            _ => {}
        }

        // The quad check must precede the single-chip RD53B one.
        if name.contains("USBPIX_GEN") {
            Self::UsbpixI4
        } else if name.contains("Rd53a") {
            Self::Rd53a
        } else if name.contains("RD53BQUAD") {
            Self::Rd53bQuad
        } else if name.contains("Rd53b") || name.contains("RD53B") {
            Self::Rd53b
        } else if name.contains("CAEN") {
            Self::CaenDt5742
        } else if name.contains("ETROC") {
            Self::Etroc
        } else {
            Self::Unknown
        }
    }

    /// Whether hits of this family carry an analog amplitude.
    #[must_use]
    pub fn is_analog(self) -> bool {
        matches!(
            self,
            Self::Depfet
                | Self::Apix
                | Self::Usbpix
                | Self::UsbpixI4
                | Self::Explorer
                | Self::Apts
                | Self::Opamp
                | Self::Rd53a
                | Self::Rd53b
                | Self::Rd53bQuad
                | Self::CaenDt5742
                | Self::Etroc
        )
    }

    /// Whether this family is read out as a timing plane.
    #[must_use]
    pub fn is_timing(self) -> bool {
        matches!(self, Self::CaenDt5742 | Self::Etroc)
    }

    /// Whether clustering applies to this family.
    #[must_use]
    pub fn is_clusterable(self) -> bool {
        !matches!(self, Self::Fortis)
    }

    /// Default readout segmentation of this family.
    #[must_use]
    pub fn section_layout(self) -> Option<SectionLayout> {
        match self {
            Self::Mimosa26 => Some(SectionLayout::mimosa26()),
            _ => None,
        }
    }
}

/// Column-based readout segmentation of a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SectionLayout {
    /// Number of columns per section.
    pub boundary: u32,
    /// Number of sections.
    pub sections: u32,
}

impl SectionLayout {
    /// Four sections of 288 columns.
    #[must_use]
    pub fn mimosa26() -> Self {
        Self {
            boundary: 288,
            sections: 4,
        }
    }

    /// Section of a column, `None` when outside the layout.
    #[must_use]
    pub fn section_of(&self, x: i32) -> Option<usize> {
        if x < 0 || self.boundary == 0 {
            return None;
        }
        let section = x.unsigned_abs() / self.boundary;
        (section < self.sections).then_some(section as usize)
    }
}

/// Decoded hits of one DUT for one event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plane {
    name: String,
    id: u32,
    sensor: SensorType,
    max_x: i32,
    max_y: i32,
    sections: Option<SectionLayout>,
    hits: Vec<Hit>,
    bad_hits: Vec<Hit>,
    clusters: Vec<Cluster>,
    section_hits: Vec<Vec<Hit>>,
    section_clusters: Vec<Vec<Cluster>>,
}

impl Plane {
    /// Creates a plane whose sensor family is derived from its name.
    #[must_use]
    pub fn new(name: impl Into<String>, id: u32, max_x: i32, max_y: i32) -> Self {
        let name = name.into();
        let sensor = SensorType::from_name(&name);
        Self::with_sensor(name, id, sensor, max_x, max_y)
    }

    /// Creates a plane with an explicit sensor family.
    #[must_use]
    pub fn with_sensor(
        name: impl Into<String>,
        id: u32,
        sensor: SensorType,
        max_x: i32,
        max_y: i32,
    ) -> Self {
        let sections = sensor.section_layout();
        let n_sections = sections.map_or(0, |s| s.sections as usize);
        Self {
            name: name.into(),
            id,
            sensor,
            max_x,
            max_y,
            sections,
            hits: Vec::new(),
            bad_hits: Vec::new(),
            clusters: Vec::new(),
            section_hits: vec![Vec::new(); n_sections],
            section_clusters: vec![Vec::new(); n_sections],
        }
    }

    /// Returns a plane with the same identity and extents but no content.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        let mut plane = Self::with_sensor(
            self.name.clone(),
            self.id,
            self.sensor,
            self.max_x,
            self.max_y,
        );
        plane.set_section_layout(self.sections);
        plane
    }

    /// Overrides the readout segmentation. Clears section content.
    pub fn set_section_layout(&mut self, layout: Option<SectionLayout>) {
        let n_sections = layout.map_or(0, |s| s.sections as usize);
        self.sections = layout;
        self.section_hits = vec![Vec::new(); n_sections];
        self.section_clusters = vec![Vec::new(); n_sections];
    }

    /// Appends a hit. Out-of-grid hits are kept and also recorded as bad.
    pub fn add_hit(&mut self, hit: Hit) {
        if !self.in_grid(&hit) {
            self.bad_hits.push(hit.clone());
        }

        if let Some(layout) = self.sections {
            match layout.section_of(hit.x()) {
                Some(section) => self.section_hits[section].push(hit.clone()),
                None => log::warn!(
                    "plane {}/{}: invalid section for hit ({}, {})",
                    self.name,
                    self.id,
                    hit.x(),
                    hit.y()
                ),
            }
        }

        self.hits.push(hit);
    }

    /// Whether a hit falls inside `[0, max_x) x [0, max_y)`.
    #[must_use]
    pub fn in_grid(&self, hit: &Hit) -> bool {
        hit.is_valid() && hit.x() < self.max_x && hit.y() < self.max_y
    }

    /// Recomputes the clusters with the given algorithm.
    ///
    /// Families that are not clusterable end up with no clusters.
    pub fn compute_clusters<A: ClusteringAlgorithm + ?Sized>(&mut self, algorithm: &A) {
        self.clusters.clear();
        for section in &mut self.section_clusters {
            section.clear();
        }

        if !self.sensor.is_clusterable() {
            return;
        }

        self.clusters = algorithm.cluster(&self.hits);

        if let Some(layout) = self.sections {
            for cluster in &self.clusters {
                let Some((x, _)) = cluster.position() else {
                    continue;
                };
                #[allow(clippy::cast_possible_truncation)]
                let column = x as i32;
                if let Some(section) = layout.section_of(column) {
                    self.section_clusters[section].push(cluster.clone());
                }
            }
        }
    }

    /// Clears all hits and clusters, keeping identity and extents.
    pub fn reset(&mut self) {
        self.hits.clear();
        self.bad_hits.clear();
        self.clusters.clear();
        for section in &mut self.section_hits {
            section.clear();
        }
        for section in &mut self.section_clusters {
            section.clear();
        }
    }

    /// Plane name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plane identifier.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Sensor family.
    #[must_use]
    pub fn sensor(&self) -> SensorType {
        self.sensor
    }

    /// Grid extent in x.
    #[must_use]
    pub fn max_x(&self) -> i32 {
        self.max_x
    }

    /// Grid extent in y.
    #[must_use]
    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    /// All hits in insertion order.
    #[must_use]
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Number of hits.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.hits.len()
    }

    /// Hits outside the grid.
    #[must_use]
    pub fn bad_hits(&self) -> &[Hit] {
        &self.bad_hits
    }

    /// Clusters from the last clustering pass.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Readout segmentation, if any.
    #[must_use]
    pub fn section_layout(&self) -> Option<SectionLayout> {
        self.sections
    }

    /// Hits routed to one readout section.
    #[must_use]
    pub fn section_hits(&self, section: usize) -> &[Hit] {
        self.section_hits.get(section).map_or(&[], Vec::as_slice)
    }

    /// Clusters routed to one readout section.
    #[must_use]
    pub fn section_clusters(&self, section: usize) -> &[Cluster] {
        self.section_clusters.get(section).map_or(&[], Vec::as_slice)
    }
}
