//! Contact aggregation.
//!
//! Every contact reported during a step is classified against the up-axis as
//! ground, steep or ignored, and summed into a [`StepState`]. The state is
//! built fresh for every step and never carries counts across steps.

use bevy::prelude::*;

use crate::collision::Contact;
use crate::config::SlopeThresholds;

/// Contacts with an up-dot above this (but below the ground threshold) are steep.
/// Anything lower faces away from the up-axis and is ignored.
pub const STEEP_MIN_DOT: f32 = -0.01;

/// How a single contact was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactClass {
    /// Walkable surface.
    Ground,
    /// Wall-like surface, possibly promoted to ground later.
    Steep,
    /// Ceiling or overhang.
    Ignored,
}

/// Read-only record of an accepted ground contact, for visualization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContactRecord {
    pub collider: Option<Entity>,
    pub point: Vec3,
    pub normal: Vec3,
    /// Normal that went into the adjusted accumulator.
    pub adjusted_normal: Vec3,
}

/// Inputs needed to classify contacts during one step.
#[derive(Debug, Clone, Copy)]
pub struct ContactContext {
    /// Current up-axis (opposite of gravity).
    pub up_axis: Vec3,
    pub thresholds: SlopeThresholds,
    /// Lower corner of the character's collision volume.
    pub bounds_min: Vec3,
    /// Velocity the solver produced on the previous step.
    pub last_velocity: Vec3,
    /// Duration of the frame the velocity was measured over.
    pub frame_dt: f32,
    /// Fixed simulation step duration.
    pub fixed_dt: f32,
}

impl ContactContext {
    /// Vertical speed of the previous step, rescaled from the frame timestep
    /// to the fixed one.
    ///
    /// The flatness test compares this speed directly against a distance.
    pub fn last_step_rise(&self) -> f32 {
        if self.frame_dt <= f32::EPSILON {
            return 0.0;
        }
        (self.last_velocity.dot(self.up_axis) / self.frame_dt * self.fixed_dt).abs()
    }

    /// Whether the contact sits closer to the bottom of the collider than the
    /// previous step's vertical speed.
    ///
    /// This is a heuristic for multi-contact situations on flat ground next to
    /// a slope or stair edge. It has not been validated against slope and
    /// stair fixtures and can misfire while moving fast on a slope.
    pub fn is_flat_contact(&self, point: Vec3) -> bool {
        let diff = (self.bounds_min.dot(self.up_axis) - point.dot(self.up_axis)).abs();
        diff < self.last_step_rise()
    }
}

/// Per-step contact accumulators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepState {
    pub(crate) ground_contact_count: u32,
    pub(crate) steep_contact_count: u32,
    pub(crate) ground_normal: Vec3,
    pub(crate) adjusted_ground_normal: Vec3,
    pub(crate) steep_normal: Vec3,
    pub(crate) ground_contacts: Vec<GroundContactRecord>,
}

impl StepState {
    /// Empty accumulators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one contact and add it to the accumulators.
    pub fn evaluate_contact(&mut self, contact: &Contact, ctx: &ContactContext) -> ContactClass {
        self.evaluate_contact_at(contact, contact.point, ctx)
    }

    /// Classify one contact, using `reference_point` for the flatness test
    /// and the debug record.
    pub fn evaluate_contact_at(
        &mut self,
        contact: &Contact,
        reference_point: Vec3,
        ctx: &ContactContext,
    ) -> ContactClass {
        let min_dot = ctx.thresholds.min_dot(contact.layer);
        let updot = ctx.up_axis.dot(contact.normal);

        if updot >= min_dot {
            self.ground_contact_count += 1;
            self.ground_normal += contact.normal;

            let adjusted_normal = if ctx.is_flat_contact(reference_point) {
                ctx.up_axis
            } else {
                contact.normal
            };
            self.adjusted_ground_normal += adjusted_normal;

            self.ground_contacts.push(GroundContactRecord {
                collider: contact.collider,
                point: reference_point,
                normal: contact.normal,
                adjusted_normal,
            });
            ContactClass::Ground
        } else if updot > STEEP_MIN_DOT {
            self.steep_contact_count += 1;
            self.steep_normal += contact.normal;
            ContactClass::Steep
        } else {
            ContactClass::Ignored
        }
    }

    /// Classify a batch of contacts. May be called any number of times per step.
    ///
    /// Contacts with the same collider share the point of the first one in
    /// the batch; contacts without a collider use their own point.
    pub fn evaluate_contacts<'a>(
        &mut self,
        contacts: impl IntoIterator<Item = &'a Contact>,
        ctx: &ContactContext,
    ) {
        let mut first_points: Vec<(Entity, Vec3)> = Vec::new();
        for contact in contacts {
            let reference_point = match contact.collider {
                Some(collider) => match first_points.iter().find(|(e, _)| *e == collider) {
                    Some(&(_, point)) => point,
                    None => {
                        first_points.push((collider, contact.point));
                        contact.point
                    }
                },
                None => contact.point,
            };
            self.evaluate_contact_at(contact, reference_point, ctx);
        }
    }

    /// Number of accepted ground contacts (including synthetic ones).
    pub fn ground_contact_count(&self) -> u32 {
        self.ground_contact_count
    }

    /// Number of steep contacts.
    pub fn steep_contact_count(&self) -> u32 {
        self.steep_contact_count
    }

    /// Sum of raw ground normals.
    pub fn ground_normal(&self) -> Vec3 {
        self.ground_normal
    }

    /// Sum of flatness-corrected ground normals.
    pub fn adjusted_ground_normal(&self) -> Vec3 {
        self.adjusted_ground_normal
    }

    /// Sum of steep normals (normalized once promotion has been attempted).
    pub fn steep_normal(&self) -> Vec3 {
        self.steep_normal
    }

    /// Accepted ground contacts in report order.
    pub fn ground_contacts(&self) -> &[GroundContactRecord] {
        &self.ground_contacts
    }

    #[inline]
    pub fn on_ground(&self) -> bool {
        self.ground_contact_count > 0
    }

    #[inline]
    pub fn on_steep(&self) -> bool {
        self.steep_contact_count > 0
    }
}
